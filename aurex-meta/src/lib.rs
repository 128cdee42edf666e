//! # aurex-meta
//!
//! Resolves human-readable metadata for decoded audio assets.
//!
//! **Pipeline:**
//! 1. `pcm`: decode a bounded prefix of the asset into mono samples
//! 2. `fingerprint`: deterministic content fingerprint (the cache key)
//! 3. `cache`: fingerprint-keyed persistent store (SQLite or in-memory)
//! 4. `services`: AcoustID → MusicBrainz → Cover Art Archive
//! 5. `resolver`: ties the above together, always producing metadata

pub mod cache;
pub mod error;
pub mod fingerprint;
pub mod pcm;
pub mod resolver;
pub mod services;
pub mod single_flight;
pub mod types;

pub use cache::{open_cache_or_degrade, MemoryMetadataCache, MetadataCache, SqliteMetadataCache};
pub use error::{CacheError, FingerprintError, LookupError};
pub use fingerprint::FingerprintGenerator;
pub use pcm::{extract_samples, extract_samples_from_bytes};
pub use resolver::MetadataResolver;
pub use types::{AudioSamples, Fingerprint, Resolution, ResolutionSource, ResolvedMetadata};
