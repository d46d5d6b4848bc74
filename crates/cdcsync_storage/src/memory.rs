//! In-memory key-value store.

use crate::clock::{Clock, SystemClock};
use crate::error::StorageResult;
use crate::store::{KeyValueStore, StoredEntry};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// An in-memory key-value store.
///
/// Suitable for:
/// - Unit and integration tests
/// - Single-process deployments that do not need state across restarts
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use cdcsync_storage::{InMemoryStore, KeyValueStore, ManualClock};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let clock = Arc::new(ManualClock::new(Duration::from_secs(10)));
/// let store = InMemoryStore::with_clock(clock.clone());
/// store.set_with_ttl("await", b"1", Duration::from_secs(5)).unwrap();
/// assert!(store.get("await").unwrap().is_some());
///
/// clock.advance(Duration::from_secs(5));
/// assert!(store.get("await").unwrap().is_none());
/// ```
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, StoredEntry>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryStore {
    /// Creates an empty store on the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty store that evaluates expiry against `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Returns the number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries.read().values().filter(|e| e.is_live(now)).count()
    }

    /// Returns true if there are no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        before - entries.len()
    }

    /// Removes all entries.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("entries", &self.entries.read().len())
            .finish_non_exhaustive()
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let now = self.clock.now();
        Ok(self
            .entries
            .read()
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.data.clone()))
    }

    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        self.entries
            .write()
            .insert(key.to_string(), StoredEntry::persistent(value));
        Ok(())
    }

    fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> StorageResult<()> {
        let entry = StoredEntry::expiring(value, self.clock.now(), ttl);
        self.entries.write().insert(key.to_string(), entry);
        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let now = self.clock.now();
        Ok(self
            .entries
            .write()
            .remove(key)
            .is_some_and(|e| e.is_live(now)))
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let now = self.clock.now();
        let mut keys: Vec<String> = self
            .entries
            .read()
            .iter()
            .filter(|(_, e)| e.is_live(now))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}
