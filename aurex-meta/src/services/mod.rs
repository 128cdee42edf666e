//! External lookup services
//!
//! The resolver chains: fingerprint → recording ids → recording → cover art.
//! Each stage is a trait so tests and embedders can substitute their own.

mod acoustid;
mod coverart;
mod musicbrainz;

pub use acoustid::AcoustIdClient;
pub use coverart::CoverArtArchiveClient;
pub use musicbrainz::MusicBrainzClient;

use crate::error::LookupError;
use crate::types::Fingerprint;
use async_trait::async_trait;
use std::num::NonZeroU32;

/// Rate limiter shared by the HTTP clients
pub(crate) type RateLimiter = governor::RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

pub(crate) fn rate_limiter(requests_per_second: u32) -> RateLimiter {
    let per_second = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
    governor::RateLimiter::direct(governor::Quota::per_second(per_second))
}

/// Recording returned by a recording lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    pub id: String,
    pub title: String,
    /// Full credited artist string
    pub artist: Option<String>,
    pub length_ms: Option<u64>,
    pub releases: Vec<ReleaseRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRef {
    pub id: String,
    pub title: String,
}

/// Stage a: fingerprint → candidate recording ids, best first
#[async_trait]
pub trait AcousticFingerprintService: Send + Sync {
    async fn lookup(&self, fingerprint: &Fingerprint, duration_sec: u64) -> Result<Vec<String>, LookupError>;
}

/// Stage b: recording id → recording details; `None` when the id is unknown
#[async_trait]
pub trait RecordingLookupService: Send + Sync {
    async fn lookup_recording(&self, recording_id: &str) -> Result<Option<Recording>, LookupError>;
}

/// Stage c: release id → cover image URL
#[async_trait]
pub trait CoverArtService: Send + Sync {
    async fn cover_for_release(&self, release_id: &str) -> Result<Option<String>, LookupError>;
}

/// HTTP client with the configured user agent and per-request timeout
pub(crate) fn http_client(user_agent: &str, timeout: std::time::Duration) -> Result<reqwest::Client, LookupError> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
        .map_err(|e| LookupError::Network(e.to_string()))
}

/// Error body of a non-success response
pub(crate) async fn api_error(response: reqwest::Response) -> LookupError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    LookupError::Api(status, text)
}
