//! Fingerprint-keyed metadata cache
//!
//! The resolver holds an `Option<Arc<dyn MetadataCache>>`; `None` is no-cache
//! mode. Entries are only replaced by a fresh resolution of the same
//! fingerprint.

mod sqlite;

pub use sqlite::SqliteMetadataCache;

use crate::error::CacheError;
use crate::types::{Fingerprint, ResolvedMetadata};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

/// Persistent key-value store from fingerprint to resolved metadata
#[async_trait]
pub trait MetadataCache: Send + Sync {
    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<ResolvedMetadata>, CacheError>;

    /// Insert or overwrite the entry for `fingerprint`
    async fn put(&self, fingerprint: &Fingerprint, metadata: &ResolvedMetadata) -> Result<(), CacheError>;
}

/// Process-local cache
#[derive(Debug, Default)]
pub struct MemoryMetadataCache {
    entries: RwLock<HashMap<Fingerprint, ResolvedMetadata>>,
}

impl MemoryMetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl MetadataCache for MemoryMetadataCache {
    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<ResolvedMetadata>, CacheError> {
        Ok(self.entries.read().await.get(fingerprint).cloned())
    }

    async fn put(&self, fingerprint: &Fingerprint, metadata: &ResolvedMetadata) -> Result<(), CacheError> {
        self.entries
            .write()
            .await
            .insert(fingerprint.clone(), metadata.clone());
        Ok(())
    }
}

/// Open the SQLite cache at `path`, or `None` (no-cache mode) when it cannot be opened
pub async fn open_cache_or_degrade(path: &Path) -> Option<Arc<dyn MetadataCache>> {
    match SqliteMetadataCache::open(path).await {
        Ok(cache) => Some(Arc::new(cache)),
        Err(e) => {
            let error = CacheError::Unavailable(format!("{:#}", e));
            warn!(
                path = %path.display(),
                error = %error,
                "Continuing without metadata cache"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_cache_put_overwrites() {
        let cache = MemoryMetadataCache::new();
        let fp = Fingerprint::new("k");
        assert!(cache.get(&fp).await.unwrap().is_none());

        let first = ResolvedMetadata::fallback(fp.clone(), "One", "A", 1);
        cache.put(&fp, &first).await.unwrap();

        let mut second = first.clone();
        second.title = "Two".into();
        cache.put(&fp, &second).await.unwrap();

        assert_eq!(cache.get(&fp).await.unwrap(), Some(second));
        assert_eq!(cache.len().await, 1);
    }
}
