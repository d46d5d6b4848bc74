//! Test fixtures: observable sources, recording listeners and stores.

use cdcsync_codec::Value;
use cdcsync_engine::{
    ChangeEvent, ChangeHandler, EntitySource, FullSyncEvent, FullSyncHandler, MapSource,
};
use cdcsync_storage::{FileStore, KeyValueStore, StorageError, StorageResult};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// An in-memory source that counts how often it is read.
///
/// The count lets tests tell a debounced detection (no reads) from one
/// that ran and found nothing new.
#[derive(Debug, Default)]
pub struct CountingSource {
    inner: MapSource,
    resolves: AtomicUsize,
}

impl CountingSource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines or redefines `name`.
    pub fn set(&self, name: &str, value: impl Into<Value>) {
        self.inner.set(name, value);
    }

    /// Undefines `name`.
    pub fn unset(&self, name: &str) {
        self.inner.unset(name);
    }

    /// Number of `resolve` calls so far.
    pub fn resolves(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }
}

impl EntitySource for CountingSource {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        self.inner.resolve(name)
    }
}

/// Collects every event delivered to its handlers.
#[derive(Debug, Clone, Default)]
pub struct RecordingListener {
    changes: Arc<Mutex<Vec<ChangeEvent>>>,
    full_syncs: Arc<Mutex<Vec<FullSyncEvent>>>,
}

impl RecordingListener {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// A change handler appending to this recorder.
    pub fn change_handler(&self) -> ChangeHandler {
        let changes = self.changes.clone();
        Arc::new(move |event: &ChangeEvent| {
            changes.lock().push(event.clone());
            Ok(())
        })
    }

    /// A full-sync handler appending to this recorder.
    pub fn full_sync_handler(&self) -> FullSyncHandler {
        let full_syncs = self.full_syncs.clone();
        Arc::new(move |event: &FullSyncEvent| {
            full_syncs.lock().push(event.clone());
            Ok(())
        })
    }

    /// Removes and returns the recorded change events.
    pub fn take_changes(&self) -> Vec<ChangeEvent> {
        std::mem::take(&mut *self.changes.lock())
    }

    /// Removes and returns the recorded full-sync events.
    pub fn take_full_syncs(&self) -> Vec<FullSyncEvent> {
        std::mem::take(&mut *self.full_syncs.lock())
    }

    /// Recorded change events as `(name, value)` pairs, without removing them.
    pub fn change_pairs(&self) -> Vec<(String, Value)> {
        self.changes
            .lock()
            .iter()
            .map(|e| (e.name.clone(), e.value.clone()))
            .collect()
    }
}

/// A store wrapper that can be switched into failing every call.
pub struct FlakyStore {
    inner: Arc<dyn KeyValueStore>,
    down: AtomicBool,
}

impl FlakyStore {
    /// Wraps `inner`, initially healthy.
    pub fn new(inner: Arc<dyn KeyValueStore>) -> Self {
        Self {
            inner,
            down: AtomicBool::new(false),
        }
    }

    /// Makes every following call fail with [`StorageError::Unavailable`].
    pub fn go_down(&self) {
        self.down.store(true, Ordering::SeqCst);
    }

    /// Lets calls through again.
    pub fn come_back(&self) {
        self.down.store(false, Ordering::SeqCst);
    }

    fn check(&self) -> StorageResult<()> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("store is down".into()));
        }
        Ok(())
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        self.check()?;
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        self.check()?;
        self.inner.set(key, value)
    }

    fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> StorageResult<()> {
        self.check()?;
        self.inner.set_with_ttl(key, value, ttl)
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        self.check()?;
        self.inner.delete(key)
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        self.check()?;
        self.inner.keys()
    }
}

/// Runs `f` with a file store in a temporary directory.
///
/// The directory outlives `f`, so `f` may reopen the path to simulate a
/// process restart.
pub fn with_file_store<F, R>(f: F) -> R
where
    F: FnOnce(Arc<FileStore>, &Path) -> R,
{
    let dir = TempDir::new().expect("Failed to create temp directory");
    let path = dir.path().join("sync-state.cbor");
    let store = FileStore::open(&path).expect("Failed to open file store");
    f(Arc::new(store), &path)
}
