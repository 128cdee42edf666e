//! SQLite-backed metadata cache

use super::MetadataCache;
use crate::error::CacheError;
use crate::types::{Fingerprint, ResolvedMetadata};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::path::Path;

/// Cache table: one JSON entry per fingerprint
pub struct SqliteMetadataCache {
    pool: SqlitePool,
}

impl SqliteMetadataCache {
    /// Open (creating if needed) the database at `db_path`
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create cache directory {}", parent.display()))?;
            }
        }

        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        tracing::debug!("Connecting to metadata cache: {}", db_url);

        let pool = SqlitePool::connect(&db_url)
            .await
            .with_context(|| format!("Failed to open metadata cache {}", db_path.display()))?;

        Self::from_pool(pool)
            .await
            .context("Failed to initialize metadata cache table")
    }

    /// Use an existing pool, creating the cache table if missing
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, CacheError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS metadata_cache (
                fingerprint TEXT PRIMARY KEY,
                entry TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        tracing::info!("Metadata cache table initialized");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl MetadataCache for SqliteMetadataCache {
    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<ResolvedMetadata>, CacheError> {
        let entry: Option<String> =
            sqlx::query_scalar("SELECT entry FROM metadata_cache WHERE fingerprint = ?")
                .bind(fingerprint.as_str())
                .fetch_optional(&self.pool)
                .await?;

        entry
            .map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(CacheError::from)
    }

    async fn put(&self, fingerprint: &Fingerprint, metadata: &ResolvedMetadata) -> Result<(), CacheError> {
        let entry = serde_json::to_string(metadata)?;
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO metadata_cache (fingerprint, entry, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(fingerprint) DO UPDATE SET
                entry = excluded.entry,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(fingerprint.as_str())
        .bind(entry)
        .bind(now)
        .execute(&self.pool)
        .await?;

        tracing::debug!(fingerprint = %fingerprint, "Metadata cached");
        Ok(())
    }
}
