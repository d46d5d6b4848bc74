//! Key-value store trait definition.

use crate::clock::duration_to_micros;
use crate::error::StorageResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A named slot holding opaque bytes with optional expiry.
///
/// Stores interpret neither keys nor values. An entry whose expiry has
/// passed behaves exactly like a missing one.
///
/// # Invariants
///
/// - `get` returns the bytes of the last `set`/`set_with_ttl` for that key,
///   unless it has expired or been deleted
/// - `set` clears any expiry previously attached to the key
/// - Implementations must be `Send + Sync`; there is no cross-call
///   atomicity, so callers doing read-modify-write may lose updates
pub trait KeyValueStore: Send + Sync {
    /// Returns the live value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Stores `value` under `key` with no expiry.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()>;

    /// Stores `value` under `key`, live for `ttl` from now.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> StorageResult<()>;

    /// Removes `key`. Returns whether a live value was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Returns every live key, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn keys(&self) -> StorageResult<Vec<String>>;

    /// Returns the live value under `key`, or `default` if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn get_or(&self, key: &str, default: Vec<u8>) -> StorageResult<Vec<u8>> {
        Ok(self.get(key)?.unwrap_or(default))
    }
}

/// A stored value and its expiry, as kept by the bundled backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    /// The opaque value.
    pub data: Vec<u8>,
    /// Expiry as microseconds since the Unix epoch, if any.
    pub expires_at: Option<u64>,
}

impl StoredEntry {
    /// Creates an entry that never expires.
    pub fn persistent(data: &[u8]) -> Self {
        Self {
            data: data.to_vec(),
            expires_at: None,
        }
    }

    /// Creates an entry expiring `ttl` after `now`.
    pub fn expiring(data: &[u8], now: Duration, ttl: Duration) -> Self {
        Self {
            data: data.to_vec(),
            expires_at: Some(duration_to_micros(now.saturating_add(ttl))),
        }
    }

    /// Returns true if the entry is still live at `now`.
    pub fn is_live(&self, now: Duration) -> bool {
        self.expires_at
            .map_or(true, |at| duration_to_micros(now) < at)
    }
}
