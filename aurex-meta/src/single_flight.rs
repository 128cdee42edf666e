//! Per-fingerprint in-flight locks
//!
//! At most one resolution per fingerprint runs the cache lookup and external
//! chain at a time; later arrivals wait and then find the cached result. An
//! entry is removed once no resolution holds or awaits it.

use crate::types::Fingerprint;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct SingleFlight {
    locks: Mutex<HashMap<Fingerprint, Arc<AsyncMutex<()>>>>,
}

/// Held for the duration of one resolution
///
/// Fields drop in order: the async lock is released before the map entry is
/// inspected.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    _guard: OwnedMutexGuard<()>,
    _registration: Registration<'a>,
}

/// Removes the map entry when the last holder or waiter goes away
#[derive(Debug)]
struct Registration<'a> {
    owner: &'a SingleFlight,
    key: Fingerprint,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other resolution of `key` is in flight
    pub async fn acquire(&self, key: &Fingerprint) -> InFlightGuard<'_> {
        // Declared first so a waiter dropped mid-await still cleans up
        let registration = Registration {
            owner: self,
            key: key.clone(),
        };
        let lock = {
            let mut locks = self.locks();
            Arc::clone(locks.entry(key.clone()).or_default())
        };

        InFlightGuard {
            _guard: lock.lock_owned().await,
            _registration: registration,
        }
    }

    /// Fingerprints currently held or awaited
    pub fn in_flight(&self) -> usize {
        self.locks().len()
    }

    fn locks(&self) -> MutexGuard<'_, HashMap<Fingerprint, Arc<AsyncMutex<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        let mut locks = self.owner.locks();
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
    }
}
