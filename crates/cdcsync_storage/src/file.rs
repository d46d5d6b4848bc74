//! File-backed key-value store.

use crate::clock::{Clock, SystemClock};
use crate::error::{StorageError, StorageResult};
use crate::store::{KeyValueStore, StoredEntry};
use fs2::FileExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Current snapshot format version.
const SNAPSHOT_VERSION: u32 = 1;

/// On-disk layout of the whole store.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    entries: BTreeMap<String, StoredEntry>,
}

/// A file-backed key-value store.
///
/// The whole store is one CBOR snapshot file. Every operation re-reads
/// the file, so several processes pointing at the same path observe each
/// other's writes. A sidecar `.lock` file serializes access: readers take
/// a shared lock, writers an exclusive one.
///
/// # Durability
///
/// Writes go to a temporary file that is synced and then renamed over the
/// snapshot, so a crash leaves either the old or the new state.
///
/// # Example
///
/// ```no_run
/// use cdcsync_storage::{FileStore, KeyValueStore};
/// use std::path::Path;
///
/// let store = FileStore::open(Path::new("sync-state.cbor")).unwrap();
/// store.set("checksums", b"\xa0").unwrap();
/// ```
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
    temp_path: PathBuf,
    clock: Arc<dyn Clock>,
    guard: Mutex<()>,
}

impl FileStore {
    /// Opens or creates a store at the given path on the system clock.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or an
    /// existing snapshot cannot be decoded.
    pub fn open(path: &Path) -> StorageResult<Self> {
        Self::open_with_clock(path, Arc::new(SystemClock))
    }

    /// Opens or creates a store that evaluates expiry against `clock`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or an
    /// existing snapshot cannot be decoded.
    pub fn open_with_clock(path: &Path, clock: Arc<dyn Clock>) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let store = Self {
            path: path.to_path_buf(),
            lock_path: sidecar(path, "lock"),
            temp_path: sidecar(path, "tmp"),
            clock,
            guard: Mutex::new(()),
        };

        // Fail early on a corrupt snapshot rather than on first use.
        store.with_shared_lock(|| store.read_snapshot().map(|_| ()))?;
        Ok(store)
    }

    /// Returns the path to the snapshot file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drops every expired entry. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be read or written.
    pub fn purge_expired(&self) -> StorageResult<usize> {
        let now = self.clock.now();
        self.update(|snapshot| {
            let before = snapshot.entries.len();
            snapshot.entries.retain(|_, e| e.is_live(now));
            Ok(before - snapshot.entries.len())
        })
    }

    fn lock_file(&self) -> StorageResult<File> {
        Ok(OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)?)
    }

    fn with_shared_lock<T>(&self, f: impl FnOnce() -> StorageResult<T>) -> StorageResult<T> {
        let _guard = self.guard.lock();
        let lock = self.lock_file()?;
        lock.lock_shared()?;
        let result = f();
        lock.unlock()?;
        result
    }

    fn update<T>(&self, f: impl FnOnce(&mut Snapshot) -> StorageResult<T>) -> StorageResult<T> {
        let _guard = self.guard.lock();
        let lock = self.lock_file()?;
        lock.lock_exclusive()?;

        let result = self.read_snapshot().and_then(|mut snapshot| {
            let out = f(&mut snapshot)?;
            self.write_snapshot(&snapshot)?;
            Ok(out)
        });

        lock.unlock()?;
        result
    }

    fn read_snapshot(&self) -> StorageResult<Snapshot> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Snapshot::default()),
            Err(e) => return Err(e.into()),
        };
        if file.metadata()?.len() == 0 {
            return Ok(Snapshot::default());
        }

        let snapshot: Snapshot = ciborium::de::from_reader(BufReader::new(file))
            .map_err(|e| StorageError::Corrupted(e.to_string()))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StorageError::Corrupted(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }
        Ok(snapshot)
    }

    fn write_snapshot(&self, snapshot: &Snapshot) -> StorageResult<()> {
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            entries: snapshot.entries.clone(),
        };

        let file = File::create(&self.temp_path)?;
        let mut writer = BufWriter::new(file);
        ciborium::ser::into_writer(&snapshot, &mut writer)
            .map_err(|e| StorageError::Corrupted(e.to_string()))?;
        writer.flush()?;
        let file = writer
            .into_inner()
            .map_err(|e| StorageError::Io(e.into_error()))?;
        file.sync_all()?;
        drop(file);

        fs::rename(&self.temp_path, &self.path)?;
        trace!(path = %self.path.display(), entries = snapshot.entries.len(), "wrote store snapshot");
        Ok(())
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let now = self.clock.now();
        self.with_shared_lock(|| {
            let snapshot = self.read_snapshot()?;
            Ok(snapshot
                .entries
                .get(key)
                .filter(|e| e.is_live(now))
                .map(|e| e.data.clone()))
        })
    }

    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        self.update(|snapshot| {
            snapshot
                .entries
                .insert(key.to_string(), StoredEntry::persistent(value));
            Ok(())
        })
    }

    fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> StorageResult<()> {
        let entry = StoredEntry::expiring(value, self.clock.now(), ttl);
        self.update(|snapshot| {
            snapshot.entries.insert(key.to_string(), entry);
            Ok(())
        })
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let now = self.clock.now();
        self.update(|snapshot| {
            Ok(snapshot
                .entries
                .remove(key)
                .is_some_and(|e| e.is_live(now)))
        })
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let now = self.clock.now();
        self.with_shared_lock(|| {
            let snapshot = self.read_snapshot()?;
            Ok(snapshot
                .entries
                .iter()
                .filter(|(_, e)| e.is_live(now))
                .map(|(k, _)| k.clone())
                .collect())
        })
    }
}

/// Returns `path` with `.{suffix}` appended to its file name.
fn sidecar(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}
