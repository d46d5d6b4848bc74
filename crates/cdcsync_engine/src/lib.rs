//! # cdcsync Engine
//!
//! Change detection and full sync for monitored entities.
//!
//! This crate provides:
//! - Checksum bookkeeping persisted in a key-value store
//! - A debounce lock limiting how often detection runs
//! - Typed listener registry the transport subscribes to
//! - The [`SyncModule`] interface and the constants module
//! - A full-sync driver with item budgets and deadlines
//!
//! ## Detection
//!
//! [`ConstantsModule::maybe_detect_changes`] walks through these states:
//!
//! ```text
//! Idle ──lock held──▶ Skipped
//!   │
//!   └─lock acquired─▶ Detecting ──▶ Done (events emitted, checksums saved)
//! ```
//!
//! Only entities whose checksum is new or different produce a
//! [`ChangeEvent`]. Null values never do.
//!
//! ## Usage
//!
//! ```
//! use cdcsync_engine::{
//!     ChangeEvent, ConstantsConfig, ConstantsModule, DetectOutcome, MapSource, SyncContext,
//!     SyncModule,
//! };
//! use cdcsync_storage::{InMemoryStore, SystemClock};
//! use std::sync::Arc;
//!
//! let ctx = SyncContext::new(Arc::new(InMemoryStore::new()), Arc::new(SystemClock));
//! let source = Arc::new(MapSource::new());
//! source.set("WP_DEBUG", true);
//!
//! let config = ConstantsConfig::new(["WP_DEBUG"].into_iter().collect());
//! let module = ConstantsModule::new(config, &ctx, source);
//! module.init_listeners(Arc::new(|event: &ChangeEvent| {
//!     println!("{} changed to {}", event.name, event.value);
//!     Ok(())
//! }));
//!
//! let outcome = module.maybe_detect_changes().unwrap();
//! assert_eq!(outcome, DetectOutcome::Detected { emitted: 1, checked: 1 });
//! assert_eq!(module.maybe_detect_changes().unwrap(), DetectOutcome::Skipped);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod allowlist;
mod checksum_store;
mod config;
mod constants;
mod enumerator;
mod error;
mod full_sync;
mod listeners;
mod lock;
mod module;
mod registry;
mod sender;
mod source;

pub use allowlist::Allowlist;
pub use checksum_store::{ChecksumRecord, ChecksumStore};
pub use config::{
    ConstantsConfig, FullSyncConfig, ModuleScope, CONSTANTS_AWAIT_KEY, CONSTANTS_CHECKSUM_KEY,
    DEFAULT_CONSTANTS_ALLOWLIST, DEFAULT_CONSTANTS_WAIT_TIME, DEFAULT_MAX_ENQUEUE_ITEMS,
};
pub use constants::{
    ConstantsModule, DetectOutcome, CONSTANTS_MODULE, FULL_SYNC_CONSTANTS_ACTION,
    SYNC_CONSTANT_EVENT,
};
pub use enumerator::{Entities, EntityEnumerator};
pub use error::{SyncError, SyncResult};
pub use full_sync::{FullSync, FullSyncRun, ModuleProgress};
pub use listeners::{
    ChangeEvent, ChangeHandler, FullSyncEvent, FullSyncHandler, FullSyncPayload, ListenerRegistry,
};
pub use lock::DebounceLock;
pub use module::{FullSyncState, SendStatus, SyncContext, SyncModule};
pub use registry::ModuleRegistry;
pub use sender::{MemorySender, SentAction, Sender};
pub use source::{EntitySource, EnvSource, MapSource};
