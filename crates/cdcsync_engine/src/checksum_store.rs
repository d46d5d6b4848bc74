//! Persisted last-seen checksums per entity name.

use crate::error::SyncResult;
use cdcsync_codec::{from_cbor, to_canonical_cbor, Checksum, Value};
use cdcsync_storage::KeyValueStore;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{trace, warn};

/// Mapping from entity name to the checksum it had when last seen.
///
/// Stored checksums are kept as [`Value`]s so a record written by another
/// producer (strings instead of integers, say) still compares correctly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChecksumRecord {
    entries: BTreeMap<String, Value>,
}

impl ChecksumRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true iff `name` is recorded with a checksum loosely equal
    /// to `checksum`.
    pub fn is_unchanged(&self, name: &str, checksum: Checksum) -> bool {
        self.entries
            .get(name)
            .is_some_and(|stored| checksum.matches(stored))
    }

    /// Returns true if `name` has any recorded checksum.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Returns the stored checksum for `name`, as persisted.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    /// Records `checksum` for `name`, replacing any previous entry.
    pub fn insert(&mut self, name: impl Into<String>, checksum: Checksum) {
        self.entries.insert(name.into(), checksum.to_value());
    }

    /// Number of recorded names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates recorded names and stored checksums, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn to_value(&self) -> Value {
        Value::map(self.entries.iter().map(|(k, v)| (k.clone(), v.clone())))
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Map(pairs) => Some(Self {
                entries: pairs.into_iter().collect(),
            }),
            _ => None,
        }
    }
}

/// The checksum record's single key-value slot.
///
/// Provides no locking of its own: `get_all` → mutate → `save` is not
/// atomic, and concurrent writers can lose updates.
#[derive(Clone)]
pub struct ChecksumStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl ChecksumStore {
    /// Creates a checksum store over `key` in `store`.
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// The key the record is persisted under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Loads the persisted record, or an empty one if none exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the slot is not valid CBOR.
    pub fn get_all(&self) -> SyncResult<ChecksumRecord> {
        let Some(bytes) = self.store.get(&self.key)? else {
            return Ok(ChecksumRecord::new());
        };
        let value = from_cbor(&bytes)?;
        let type_name = value.type_name();
        Ok(ChecksumRecord::from_value(value).unwrap_or_else(|| {
            warn!(key = %self.key, found = type_name, "checksum slot is not a map, starting over");
            ChecksumRecord::new()
        }))
    }

    /// Overwrites the persisted record.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn save(&self, record: &ChecksumRecord) -> SyncResult<()> {
        let bytes = to_canonical_cbor(&record.to_value());
        self.store.set(&self.key, &bytes)?;
        trace!(key = %self.key, entries = record.len(), "saved checksum record");
        Ok(())
    }

    /// Deletes the persisted record.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn reset(&self) -> SyncResult<()> {
        self.store.delete(&self.key)?;
        Ok(())
    }
}

impl std::fmt::Debug for ChecksumStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChecksumStore")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
