//! AcoustID API client

use super::{api_error, http_client, rate_limiter, AcousticFingerprintService, RateLimiter};
use crate::error::LookupError;
use crate::types::Fingerprint;
use async_trait::async_trait;
use aurex_common::config::LookupConfig;
use serde::Deserialize;

/// AcoustID lookup response
#[derive(Debug, Deserialize)]
struct LookupResponse {
    status: String,
    #[serde(default)]
    results: Vec<LookupResult>,
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct LookupResult {
    id: String,
    #[serde(default)]
    score: f64,
    recordings: Option<Vec<RecordingRef>>,
}

#[derive(Debug, Deserialize)]
struct RecordingRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: u16,
    message: String,
}

/// AcoustID API client (rate limited per configuration, 3 req/s by default)
pub struct AcoustIdClient {
    http_client: reqwest::Client,
    rate_limiter: RateLimiter,
    base_url: String,
    api_key: String,
}

impl AcoustIdClient {
    pub fn new(config: &LookupConfig, api_key: String) -> Result<Self, LookupError> {
        Ok(Self {
            http_client: http_client(&config.user_agent, config.stage_timeout())?,
            rate_limiter: rate_limiter(config.acoustid_requests_per_second),
            base_url: config.acoustid_url.clone(),
            api_key,
        })
    }
}

/// Recording ids in result order, duplicates removed
fn recording_ids(response: LookupResponse) -> Result<Vec<String>, LookupError> {
    if response.status != "ok" {
        let (code, message) = response
            .error
            .map(|e| (e.code, e.message))
            .unwrap_or((0, response.status));
        return Err(LookupError::Api(code, message));
    }

    let mut ids: Vec<String> = Vec::new();
    for result in response.results {
        tracing::debug!(acoustid = %result.id, score = result.score, "AcoustID result");
        for recording in result.recordings.unwrap_or_default() {
            if !ids.contains(&recording.id) {
                ids.push(recording.id);
            }
        }
    }
    Ok(ids)
}

#[async_trait]
impl AcousticFingerprintService for AcoustIdClient {
    async fn lookup(&self, fingerprint: &Fingerprint, duration_sec: u64) -> Result<Vec<String>, LookupError> {
        self.rate_limiter.until_ready().await;

        let duration = duration_sec.to_string();
        let params = [
            ("client", self.api_key.as_str()),
            ("meta", "recordings releases"),
            ("format", "json"),
            ("duration", duration.as_str()),
            ("fingerprint", fingerprint.as_str()),
        ];

        tracing::debug!(duration_sec, "Querying AcoustID API");

        let response = self
            .http_client
            .post(&self.base_url)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body: LookupResponse = response
            .json()
            .await
            .map_err(|e| LookupError::Parse(e.to_string()))?;

        let ids = recording_ids(body)?;
        tracing::info!(matches = ids.len(), "AcoustID lookup complete");
        Ok(ids)
    }
}
