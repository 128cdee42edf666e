//! MusicBrainz API client

use super::{api_error, http_client, rate_limiter, RateLimiter, Recording, RecordingLookupService, ReleaseRef};
use crate::error::LookupError;
use async_trait::async_trait;
use aurex_common::config::LookupConfig;
use reqwest::StatusCode;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct MusicBrainzRecording {
    id: String,
    title: String,
    #[serde(rename = "artist-credit", default)]
    artist_credit: Vec<ArtistCredit>,
    #[serde(default)]
    releases: Vec<Release>,
    // Milliseconds
    length: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ArtistCredit {
    name: String,
    #[serde(default)]
    joinphrase: String,
}

#[derive(Debug, Deserialize)]
struct Release {
    id: String,
    title: String,
}

impl From<MusicBrainzRecording> for Recording {
    fn from(recording: MusicBrainzRecording) -> Self {
        let credited: String = recording
            .artist_credit
            .iter()
            .map(|credit| format!("{}{}", credit.name, credit.joinphrase))
            .collect();
        let artist = Some(credited.trim().to_string()).filter(|a| !a.is_empty());

        Recording {
            id: recording.id,
            title: recording.title,
            artist,
            length_ms: recording.length,
            releases: recording
                .releases
                .into_iter()
                .map(|r| ReleaseRef { id: r.id, title: r.title })
                .collect(),
        }
    }
}

/// MusicBrainz web service client (rate limited, 1 req/s by default)
pub struct MusicBrainzClient {
    client: reqwest::Client,
    rate_limiter: RateLimiter,
    base_url: String,
}

impl MusicBrainzClient {
    pub fn new(config: &LookupConfig) -> Result<Self, LookupError> {
        Ok(Self {
            client: http_client(&config.user_agent, config.stage_timeout())?,
            rate_limiter: rate_limiter(config.musicbrainz_requests_per_second),
            base_url: config.musicbrainz_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl RecordingLookupService for MusicBrainzClient {
    async fn lookup_recording(&self, recording_id: &str) -> Result<Option<Recording>, LookupError> {
        tracing::debug!("Fetching MusicBrainz recording: {}", recording_id);

        self.rate_limiter.until_ready().await;

        let url = format!(
            "{}/recording/{}?inc=artist-credits+releases&fmt=json",
            self.base_url, recording_id
        );

        let response = self.client.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(recording_id, "MusicBrainz recording not found");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let recording: MusicBrainzRecording = response
            .json()
            .await
            .map_err(|e| LookupError::Parse(e.to_string()))?;

        let recording = Recording::from(recording);
        tracing::debug!(
            "MusicBrainz match: '{}' by '{}'",
            recording.title,
            recording.artist.as_deref().unwrap_or("Unknown")
        );

        Ok(Some(recording))
    }
}
