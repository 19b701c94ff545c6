//! Per-entity single-flight guard.
//!
//! At most one pipeline runs per key. `try_acquire` is an atomic
//! check-and-set; a second caller for a busy key is turned away rather than
//! queued. The returned permit frees the key when dropped, whether the run
//! succeeded, failed or panicked.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// What a run is about, scoped to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FlightKey {
    Job { owner_id: Uuid, job_id: Uuid },
    Resume { owner_id: Uuid, text_sha256: String },
}

impl FlightKey {
    pub fn job(owner_id: Uuid, job_id: Uuid) -> Self {
        FlightKey::Job { owner_id, job_id }
    }

    /// Keyed by content hash so resubmitting the same text is caught, while
    /// different résumés from the same owner can run side by side.
    pub fn resume(owner_id: Uuid, text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        FlightKey::Resume {
            owner_id,
            text_sha256: format!("{:x}", hasher.finalize()),
        }
    }
}

#[derive(Clone, Default)]
pub struct SingleFlight {
    in_flight: Arc<Mutex<HashSet<FlightKey>>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `None` when a run for `key` is already in flight.
    pub fn try_acquire(&self, key: FlightKey) -> Option<FlightPermit> {
        let mut set = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !set.insert(key.clone()) {
            return None;
        }
        Some(FlightPermit {
            key,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    #[cfg(test)]
    pub fn is_busy(&self, key: &FlightKey) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }
}

/// Holds a key for the lifetime of one run.
#[must_use = "dropping the permit immediately frees the key"]
pub struct FlightPermit {
    key: FlightKey,
    in_flight: Arc<Mutex<HashSet<FlightKey>>>,
}

impl Drop for FlightPermit {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_rejected() {
        let guard = SingleFlight::new();
        let key = FlightKey::job(Uuid::new_v4(), Uuid::new_v4());
        let permit = guard.try_acquire(key.clone());
        assert!(permit.is_some());
        assert!(guard.try_acquire(key.clone()).is_none());
        assert!(guard.is_busy(&key));
    }

    #[test]
    fn test_drop_releases_key() {
        let guard = SingleFlight::new();
        let key = FlightKey::job(Uuid::new_v4(), Uuid::new_v4());
        {
            let _permit = guard.try_acquire(key.clone()).unwrap();
        }
        assert!(!guard.is_busy(&key));
        assert!(guard.try_acquire(key).is_some());
    }

    #[test]
    fn test_keys_are_owner_scoped() {
        let guard = SingleFlight::new();
        let job_id = Uuid::new_v4();
        let _a = guard.try_acquire(FlightKey::job(Uuid::new_v4(), job_id)).unwrap();
        assert!(guard
            .try_acquire(FlightKey::job(Uuid::new_v4(), job_id))
            .is_some());
    }

    #[test]
    fn test_resume_key_hashes_text() {
        let owner = Uuid::new_v4();
        assert_eq!(
            FlightKey::resume(owner, "same text"),
            FlightKey::resume(owner, "same text")
        );
        assert_ne!(
            FlightKey::resume(owner, "same text"),
            FlightKey::resume(owner, "other text")
        );
    }

    #[test]
    fn test_concurrent_acquire_admits_exactly_one() {
        let guard = SingleFlight::new();
        let key = FlightKey::job(Uuid::new_v4(), Uuid::new_v4());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let guard = guard.clone();
                let key = key.clone();
                std::thread::spawn(move || guard.try_acquire(key))
            })
            .collect();
        let permits: Vec<_> = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(permits.len(), 1);
    }
}
