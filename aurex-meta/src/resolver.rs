//! Metadata resolution: fingerprint → cache → external lookup chain
//!
//! **State machine** (terminal state is always resolved):
//! ```text
//! UNRESOLVED → CACHE_LOOKUP ─┬─ hit ──────────────────────────→ RESOLVED (CacheHit)
//!                            └─ miss → EXTERNAL_LOOKUP ─┬─ found → RESOLVED (External)
//!                                                       └─ none  → RESOLVED (Fallback)
//! ```
//! Every non-cancelled resolution writes its final metadata to the cache,
//! fallbacks included. A cancelled resolution returns the caller's values and
//! writes nothing.

use crate::cache::{open_cache_or_degrade, MetadataCache};
use crate::error::LookupError;
use crate::fingerprint::FingerprintGenerator;
use crate::services::{
    AcousticFingerprintService, AcoustIdClient, CoverArtArchiveClient, CoverArtService, MusicBrainzClient,
    Recording, RecordingLookupService,
};
use crate::single_flight::SingleFlight;
use crate::types::{AudioSamples, Fingerprint, Resolution, ResolutionSource, ResolvedMetadata};
use anyhow::Context;
use aurex_common::config::{resolve_acoustid_api_key, AurexConfig};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default upper bound for one external stage
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of a successful external chain
#[derive(Debug, Clone)]
struct ExternalMatch {
    recording: Recording,
    cover_url: Option<String>,
}

/// Resolves metadata for decoded assets; share via `Arc`
pub struct MetadataResolver {
    generator: FingerprintGenerator,
    cache: Option<Arc<dyn MetadataCache>>,
    acoustid: Arc<dyn AcousticFingerprintService>,
    recordings: Arc<dyn RecordingLookupService>,
    cover_art: Arc<dyn CoverArtService>,
    stage_timeout: Duration,
    in_flight: SingleFlight,
}

impl MetadataResolver {
    /// Resolver without a cache and with the default stage timeout
    pub fn new(
        acoustid: Arc<dyn AcousticFingerprintService>,
        recordings: Arc<dyn RecordingLookupService>,
        cover_art: Arc<dyn CoverArtService>,
    ) -> Self {
        Self {
            generator: FingerprintGenerator::new(),
            cache: None,
            acoustid,
            recordings,
            cover_art,
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
            in_flight: SingleFlight::new(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn MetadataCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    /// HTTP clients and SQLite cache built from configuration
    ///
    /// An unavailable cache degrades to no-cache mode; a missing AcoustID key
    /// is an error.
    pub async fn from_config(config: &AurexConfig) -> anyhow::Result<Self> {
        let api_key = resolve_acoustid_api_key(config)?;
        let lookup = &config.lookup;

        let acoustid = AcoustIdClient::new(lookup, api_key).context("Failed to build AcoustID client")?;
        let recordings = MusicBrainzClient::new(lookup).context("Failed to build MusicBrainz client")?;
        let cover_art = CoverArtArchiveClient::new(lookup).context("Failed to build Cover Art Archive client")?;

        let mut resolver = Self::new(Arc::new(acoustid), Arc::new(recordings), Arc::new(cover_art))
            .with_stage_timeout(lookup.stage_timeout());

        if config.cache.enabled {
            resolver.cache = open_cache_or_degrade(&config.cache.database_path()).await;
        } else {
            info!("Metadata cache disabled by configuration");
        }

        Ok(resolver)
    }

    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    /// Resolve metadata; never fails
    ///
    /// `title`, `artist` and `duration_sec` are the caller's best values and
    /// become the fallback.
    pub async fn resolve(
        &self,
        title: &str,
        artist: &str,
        duration_sec: u64,
        samples: Option<&AudioSamples>,
    ) -> ResolvedMetadata {
        self.resolve_with_cancel(title, artist, duration_sec, samples, &CancellationToken::new())
            .await
            .metadata
    }

    /// `resolve`, abandoning the chain as a unit when `cancel` fires
    pub async fn resolve_with_cancel(
        &self,
        title: &str,
        artist: &str,
        duration_sec: u64,
        samples: Option<&AudioSamples>,
        cancel: &CancellationToken,
    ) -> Resolution {
        let start = Instant::now();
        let fingerprint = self.fingerprint_for(title, artist, duration_sec, samples);
        let fallback = ResolvedMetadata::fallback(fingerprint.clone(), title, artist, duration_sec);

        let cancelled = |fallback: ResolvedMetadata| {
            info!(fingerprint = %fingerprint, "Metadata resolution cancelled");
            Resolution {
                metadata: fallback,
                source: ResolutionSource::Cancelled,
            }
        };

        if cancel.is_cancelled() {
            return cancelled(fallback);
        }

        let _flight = tokio::select! {
            biased;
            _ = cancel.cancelled() => return cancelled(fallback),
            guard = self.in_flight.acquire(&fingerprint) => guard,
        };

        if let Some(cached) = self.cache_get(&fingerprint).await {
            info!(
                fingerprint = %fingerprint,
                title = %cached.title,
                "Metadata found in cache"
            );
            return Resolution {
                metadata: cached,
                source: ResolutionSource::CacheHit,
            };
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return cancelled(fallback),
            outcome = self.run_chain(&fingerprint, duration_sec) => outcome,
        };

        let (metadata, source) = match outcome {
            Some(found) => (merge(fallback, found), ResolutionSource::External),
            None => (fallback, ResolutionSource::Fallback),
        };

        self.cache_put(&fingerprint, &metadata).await;

        info!(
            fingerprint = %fingerprint,
            source = ?source,
            title = %metadata.title,
            artist = %metadata.artist,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Metadata resolved"
        );

        Resolution { metadata, source }
    }

    fn fingerprint_for(
        &self,
        title: &str,
        artist: &str,
        duration_sec: u64,
        samples: Option<&AudioSamples>,
    ) -> Fingerprint {
        match samples.map(|s| self.generator.fingerprint(s)) {
            Some(Ok(fingerprint)) => fingerprint,
            Some(Err(e)) => {
                warn!(error = %e, "Fingerprint generation failed, using title/artist key");
                Fingerprint::degraded(title, artist, duration_sec)
            }
            None => {
                debug!("No samples supplied, using title/artist key");
                Fingerprint::degraded(title, artist, duration_sec)
            }
        }
    }

    async fn cache_get(&self, fingerprint: &Fingerprint) -> Option<ResolvedMetadata> {
        let cache = self.cache.as_ref()?;
        match cache.get(fingerprint).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!(fingerprint = %fingerprint, error = %e, "Cache lookup failed");
                None
            }
        }
    }

    async fn cache_put(&self, fingerprint: &Fingerprint, metadata: &ResolvedMetadata) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        if let Err(e) = cache.put(fingerprint, metadata).await {
            warn!(fingerprint = %fingerprint, error = %e, "Cache write failed");
        }
    }

    /// Stages a → b → c; `None` when stage a or b yields nothing
    async fn run_chain(&self, fingerprint: &Fingerprint, duration_sec: u64) -> Option<ExternalMatch> {
        let ids = match self
            .stage("acoustid", self.acoustid.lookup(fingerprint, duration_sec))
            .await
        {
            Ok(ids) => ids,
            Err(e) => {
                warn!(fingerprint = %fingerprint, error = %e, "Fingerprint lookup failed");
                return None;
            }
        };

        let Some(recording_id) = ids.first() else {
            debug!(fingerprint = %fingerprint, "No recording matches for fingerprint");
            return None;
        };

        let recording = match self
            .stage("musicbrainz", self.recordings.lookup_recording(recording_id))
            .await
        {
            Ok(Some(recording)) => recording,
            Ok(None) => {
                debug!(recording_id = %recording_id, "Recording not found");
                return None;
            }
            Err(e) => {
                warn!(recording_id = %recording_id, error = %e, "Recording lookup failed");
                return None;
            }
        };

        let cover_url = match recording.releases.first() {
            Some(release) => match self
                .stage("coverart", self.cover_art.cover_for_release(&release.id))
                .await
            {
                Ok(url) => url,
                Err(e) => {
                    warn!(release_id = %release.id, error = %e, "Cover art lookup failed");
                    None
                }
            },
            None => None,
        };

        Some(ExternalMatch { recording, cover_url })
    }

    async fn stage<T>(
        &self,
        name: &'static str,
        call: impl Future<Output = Result<T, LookupError>>,
    ) -> Result<T, LookupError> {
        match tokio::time::timeout(self.stage_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(LookupError::Timeout(format!(
                "{} stage after {} ms",
                name,
                self.stage_timeout.as_millis()
            ))),
        }
    }
}

/// External fields win; caller values fill the gaps
fn merge(fallback: ResolvedMetadata, found: ExternalMatch) -> ResolvedMetadata {
    let ExternalMatch { recording, cover_url } = found;

    let title = Some(recording.title)
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(fallback.title);
    let artist = recording
        .artist
        .filter(|a| !a.trim().is_empty())
        .unwrap_or(fallback.artist);
    let album = recording
        .releases
        .into_iter()
        .next()
        .map(|r| r.title)
        .unwrap_or_default();
    let duration_sec = recording
        .length_ms
        .map(|ms| ms / 1000)
        .filter(|&secs| secs > 0)
        .unwrap_or(fallback.duration_sec);

    ResolvedMetadata {
        fingerprint: fallback.fingerprint,
        title,
        artist,
        album,
        duration_sec,
        cover_url,
        lyrics_text: None,
    }
}
