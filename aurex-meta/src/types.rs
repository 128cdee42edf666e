//! Shared data types for metadata resolution

use serde::{Deserialize, Serialize};
use std::fmt;

/// Mono PCM samples
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSamples {
    /// Range [-1.0, 1.0]
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioSamples {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Opaque content fingerprint; the sole cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// `"{title}:{artist}:{duration}"`, used when no samples can be fingerprinted
    pub fn degraded(title: &str, artist: &str, duration_sec: u64) -> Self {
        Self(format!("{}:{}:{}", title, artist, duration_sec))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Final metadata for one asset; also the cache entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMetadata {
    pub fingerprint: Fingerprint,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration_sec: u64,
    pub cover_url: Option<String>,
    pub lyrics_text: Option<String>,
}

impl ResolvedMetadata {
    /// Caller-supplied values with empty album and no cover
    pub fn fallback(fingerprint: Fingerprint, title: &str, artist: &str, duration_sec: u64) -> Self {
        Self {
            fingerprint,
            title: title.to_string(),
            artist: artist.to_string(),
            album: String::new(),
            duration_sec,
            cover_url: None,
            lyrics_text: None,
        }
    }
}

/// Terminal path taken by a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    CacheHit,
    External,
    Fallback,
    Cancelled,
}

/// Resolved metadata plus how it was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub metadata: ResolvedMetadata,
    pub source: ResolutionSource,
}
