//! Time-boxed debounce flag.

use crate::error::SyncResult;
use cdcsync_codec::{to_canonical_cbor, Value};
use cdcsync_storage::{Clock, KeyValueStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Suppresses repeated work for a cooldown window.
///
/// Acquisition writes the current timestamp under a key with a ttl; while
/// that entry is live, further acquisitions fail. The lock is advisory:
/// two processes racing before either write lands can both acquire it.
#[derive(Clone)]
pub struct DebounceLock {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl DebounceLock {
    /// Creates a lock backed by `store`, timestamped with `clock`.
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Acquires the lock under `key` for `ttl`.
    ///
    /// Returns `false`, doing nothing, if an earlier acquisition is still
    /// live.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn try_acquire(&self, key: &str, ttl: Duration) -> SyncResult<bool> {
        if self.store.get(key)?.is_some() {
            trace!(key, "debounce lock held");
            return Ok(false);
        }

        let now = i64::try_from(self.clock.now().as_micros()).unwrap_or(i64::MAX);
        self.store
            .set_with_ttl(key, &to_canonical_cbor(&Value::Int(now)), ttl)?;
        trace!(key, ttl_secs = ttl.as_secs(), "debounce lock acquired");
        Ok(true)
    }

    /// Returns true if the lock under `key` is currently held.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn is_held(&self, key: &str) -> SyncResult<bool> {
        Ok(self.store.get(key)?.is_some())
    }

    /// Clears the lock under `key` unconditionally.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn release(&self, key: &str) -> SyncResult<()> {
        self.store.delete(key)?;
        Ok(())
    }
}

impl std::fmt::Debug for DebounceLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebounceLock").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdcsync_codec::from_cbor;
    use cdcsync_storage::{InMemoryStore, ManualClock};

    fn lock() -> (DebounceLock, Arc<ManualClock>, Arc<InMemoryStore>) {
        let clock = Arc::new(ManualClock::new(Duration::from_secs(1_000)));
        let store = Arc::new(InMemoryStore::with_clock(clock.clone()));
        (DebounceLock::new(store.clone(), clock.clone()), clock, store)
    }

    #[test]
    fn second_acquire_within_ttl_fails() {
        let (lock, clock, _) = lock();
        let ttl = Duration::from_secs(10);

        assert!(lock.try_acquire("await", ttl).unwrap());
        assert!(!lock.try_acquire("await", ttl).unwrap());

        clock.advance(Duration::from_secs(9));
        assert!(!lock.try_acquire("await", ttl).unwrap());
        assert!(lock.is_held("await").unwrap());
    }

    #[test]
    fn acquire_after_expiry_succeeds() {
        let (lock, clock, _) = lock();
        let ttl = Duration::from_secs(10);

        assert!(lock.try_acquire("await", ttl).unwrap());
        clock.advance(ttl);
        assert!(!lock.is_held("await").unwrap());
        assert!(lock.try_acquire("await", ttl).unwrap());
    }

    #[test]
    fn failed_acquire_does_not_extend() {
        let (lock, clock, _) = lock();
        let ttl = Duration::from_secs(10);

        assert!(lock.try_acquire("await", ttl).unwrap());
        clock.advance(Duration::from_secs(5));
        assert!(!lock.try_acquire("await", ttl).unwrap());
        clock.advance(Duration::from_secs(5));
        assert!(lock.try_acquire("await", ttl).unwrap());
    }

    #[test]
    fn release_clears_lock() {
        let (lock, _, _) = lock();
        assert!(lock.try_acquire("await", Duration::from_secs(60)).unwrap());
        lock.release("await").unwrap();
        assert!(lock.try_acquire("await", Duration::from_secs(60)).unwrap());
    }

    #[test]
    fn keys_are_independent() {
        let (lock, _, _) = lock();
        assert!(lock.try_acquire("a", Duration::from_secs(60)).unwrap());
        assert!(lock.try_acquire("b", Duration::from_secs(60)).unwrap());
    }

    #[test]
    fn stores_acquisition_timestamp() {
        let (lock, _, store) = lock();
        lock.try_acquire("await", Duration::from_secs(60)).unwrap();

        let bytes = store.get("await").unwrap().unwrap();
        assert_eq!(from_cbor(&bytes).unwrap(), Value::Int(1_000_000_000));
    }
}
