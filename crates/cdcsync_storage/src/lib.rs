//! # cdcsync Storage
//!
//! Key-value store backends for cdcsync.
//!
//! The sync engine persists two kinds of state between runs: the checksum
//! record of every monitored entity and the debounce lock timestamp. Both
//! live in a [`KeyValueStore`], an **opaque byte store** keyed by name
//! with optional per-key expiry. Stores do not interpret the bytes; the
//! engine owns the encoding.
//!
//! ## Design Principles
//!
//! - Values are opaque bytes
//! - Expiry is evaluated against an injectable [`Clock`]
//! - Stores must be `Send + Sync` so one instance can be shared
//! - No transactions: read-modify-write sequences can lose updates
//!
//! ## Available Backends
//!
//! - [`InMemoryStore`] - For testing and single-process use
//! - [`FileStore`] - Persistent, shareable between processes
//!
//! ## Example
//!
//! ```rust
//! use cdcsync_storage::{InMemoryStore, KeyValueStore};
//!
//! let store = InMemoryStore::new();
//! store.set("checksums", b"\xa0").unwrap();
//! assert_eq!(store.get("checksums").unwrap().as_deref(), Some(&b"\xa0"[..]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod error;
mod file;
mod memory;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{StorageError, StorageResult};
pub use file::FileStore;
pub use memory::InMemoryStore;
pub use store::{KeyValueStore, StoredEntry};
