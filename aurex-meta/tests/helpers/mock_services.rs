//! Mock lookup services with call counters

use async_trait::async_trait;
use aurex_meta::services::{
    AcousticFingerprintService, CoverArtService, Recording, RecordingLookupService, ReleaseRef,
};
use aurex_meta::{Fingerprint, LookupError, MetadataCache, MetadataResolver};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Stage a mock
pub struct MockAcoustId {
    ids: Vec<String>,
    fail: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
    seen: Mutex<Vec<Fingerprint>>,
}

impl MockAcoustId {
    pub fn matching(ids: &[&str]) -> Self {
        Self {
            ids: ids.iter().map(|id| id.to_string()).collect(),
            fail: false,
            delay: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn no_match() -> Self {
        Self::matching(&[])
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::no_match()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<Fingerprint> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl AcousticFingerprintService for MockAcoustId {
    async fn lookup(&self, fingerprint: &Fingerprint, _duration_sec: u64) -> Result<Vec<String>, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(fingerprint.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(LookupError::Api(503, "service unavailable".into()));
        }
        Ok(self.ids.clone())
    }
}

/// Stage b mock
pub struct MockRecordings {
    recording: Option<Recording>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockRecordings {
    pub fn returning(recording: Recording) -> Self {
        Self {
            recording: Some(recording),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn not_found() -> Self {
        Self {
            recording: None,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Recording "rec-1": Found Title / Found Artist on "Found Album", 3:21
    pub fn sample_recording() -> Recording {
        Recording {
            id: "rec-1".into(),
            title: "Found Title".into(),
            artist: Some("Found Artist".into()),
            length_ms: Some(201_000),
            releases: vec![ReleaseRef {
                id: "rel-1".into(),
                title: "Found Album".into(),
            }],
        }
    }
}

#[async_trait]
impl RecordingLookupService for MockRecordings {
    async fn lookup_recording(&self, _recording_id: &str) -> Result<Option<Recording>, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.recording.clone())
    }
}

/// Stage c mock
pub struct MockCoverArt {
    url: Option<String>,
    fail: bool,
    calls: AtomicUsize,
}

impl MockCoverArt {
    pub fn returning(url: &str) -> Self {
        Self {
            url: Some(url.to_string()),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            url: None,
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CoverArtService for MockCoverArt {
    async fn cover_for_release(&self, _release_id: &str) -> Result<Option<String>, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(LookupError::Network("connection reset".into()));
        }
        Ok(self.url.clone())
    }
}

/// Resolver over the given mocks and optional cache
pub fn resolver_with(
    acoustid: &Arc<MockAcoustId>,
    recordings: &Arc<MockRecordings>,
    cover_art: &Arc<MockCoverArt>,
    cache: Option<Arc<dyn MetadataCache>>,
) -> MetadataResolver {
    let resolver = MetadataResolver::new(acoustid.clone(), recordings.clone(), cover_art.clone());
    match cache {
        Some(cache) => resolver.with_cache(cache),
        None => resolver,
    }
}
