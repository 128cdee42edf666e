//! Cover Art Archive client

use super::{api_error, http_client, CoverArtService};
use crate::error::LookupError;
use async_trait::async_trait;
use aurex_common::config::LookupConfig;
use reqwest::StatusCode;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct CoverArtResponse {
    #[serde(default)]
    images: Vec<CoverImage>,
}

#[derive(Debug, Deserialize)]
struct CoverImage {
    image: Option<String>,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    large: Option<String>,
}

/// First image's large thumbnail, else its full-size URL
fn first_cover_url(response: CoverArtResponse) -> Option<String> {
    let image = response.images.into_iter().next()?;
    image.thumbnails.large.or(image.image)
}

pub struct CoverArtArchiveClient {
    client: reqwest::Client,
    base_url: String,
}

impl CoverArtArchiveClient {
    pub fn new(config: &LookupConfig) -> Result<Self, LookupError> {
        Ok(Self {
            client: http_client(&config.user_agent, config.stage_timeout())?,
            base_url: config.coverart_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CoverArtService for CoverArtArchiveClient {
    async fn cover_for_release(&self, release_id: &str) -> Result<Option<String>, LookupError> {
        let url = format!("{}/release/{}", self.base_url, release_id);
        let response = self.client.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(release_id, "No cover art for release");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body: CoverArtResponse = response
            .json()
            .await
            .map_err(|e| LookupError::Parse(e.to_string()))?;

        Ok(first_cover_url(body))
    }
}
