//! Error types for metadata resolution

use thiserror::Error;

/// External lookup failure; always degrades to fallback metadata
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for LookupError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LookupError::Timeout(e.to_string())
        } else if e.is_decode() {
            LookupError::Parse(e.to_string())
        } else {
            LookupError::Network(e.to_string())
        }
    }
}

/// Metadata cache failure; the resolver logs it and continues without the cache
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    #[error("Cache database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache entry serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Reasons a fingerprint cannot be computed from samples
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FingerprintError {
    #[error("No samples to fingerprint")]
    EmptySamples,

    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    #[error("Non-finite sample at index {0}")]
    NonFiniteSample(usize),
}
