//! The capability interface shared by every sync module.

use crate::config::ModuleScope;
use crate::error::SyncResult;
use crate::listeners::{ChangeHandler, FullSyncHandler, FullSyncPayload, ListenerRegistry};
use crate::sender::Sender;
use cdcsync_storage::{Clock, KeyValueStore};
use std::sync::Arc;
use std::time::Duration;

/// Progress marker threaded through a module's full-sync calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FullSyncState {
    /// Nothing enqueued yet.
    #[default]
    Pending,
    /// Resume after this module-specific position.
    Cursor(u64),
    /// The module has enqueued everything.
    Done,
}

impl FullSyncState {
    /// Returns true once the module reports completion.
    pub fn is_done(self) -> bool {
        matches!(self, FullSyncState::Done)
    }
}

/// Result of one immediate-send call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendStatus {
    /// True once the module has sent everything.
    pub finished: bool,
    /// State to pass to the next call if not finished.
    pub state: FullSyncState,
}

impl SendStatus {
    /// A status for a module with nothing left to send.
    pub fn finished() -> Self {
        Self {
            finished: true,
            state: FullSyncState::Done,
        }
    }

    /// A status asking to resume from `state`.
    pub fn resume(state: FullSyncState) -> Self {
        Self {
            finished: false,
            state,
        }
    }
}

/// Collaborators every module is constructed with.
#[derive(Clone)]
pub struct SyncContext {
    /// Persistent store for module bookkeeping.
    pub store: Arc<dyn KeyValueStore>,
    /// Time source for locks and deadlines.
    pub clock: Arc<dyn Clock>,
    /// Listener registry modules emit through.
    pub listeners: Arc<ListenerRegistry>,
}

impl SyncContext {
    /// Creates a context with a fresh listener registry.
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            listeners: Arc::new(ListenerRegistry::new()),
        }
    }

    /// Replaces the listener registry.
    pub fn with_listeners(mut self, listeners: Arc<ListenerRegistry>) -> Self {
        self.listeners = listeners;
        self
    }
}

impl std::fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncContext").finish_non_exhaustive()
    }
}

/// A sync module: one family of monitored objects.
///
/// Full sync is split into estimate, enqueue and send so an external
/// orchestrator can budget work across modules and resume across calls.
pub trait SyncModule: Send + Sync {
    /// Unique module name.
    fn name(&self) -> &str;

    /// Registers `handler` for this module's change events.
    fn init_listeners(&self, handler: ChangeHandler);

    /// Registers `handler` for this module's full-sync events.
    fn init_full_sync_listeners(&self, handler: FullSyncHandler);

    /// Runs before the sender drains its queue.
    fn before_send(&self) -> SyncResult<()> {
        Ok(())
    }

    /// Rewrites a full-sync payload right before it is sent.
    ///
    /// Actions the module does not own pass through untouched.
    fn expand_full_sync_payload(
        &self,
        _action: &str,
        payload: FullSyncPayload,
    ) -> SyncResult<FullSyncPayload> {
        Ok(payload)
    }

    /// Number of items a full sync under `scope` would enqueue.
    fn estimate_full_sync_actions(&self, scope: &ModuleScope) -> SyncResult<usize>;

    /// Enqueues up to `max_items` items, resuming from `state`.
    ///
    /// Returns the number enqueued and the state for the next call.
    fn enqueue_full_sync_actions(
        &self,
        scope: &ModuleScope,
        max_items: usize,
        state: FullSyncState,
    ) -> SyncResult<(usize, FullSyncState)>;

    /// Sends items immediately through `sender` until `deadline`.
    fn send_full_sync_actions(
        &self,
        scope: &ModuleScope,
        deadline: Duration,
        state: FullSyncState,
        sender: &dyn Sender,
    ) -> SyncResult<SendStatus>;

    /// Full-sync action names this module emits.
    fn full_sync_actions(&self) -> Vec<String>;

    /// Number of objects the module monitors.
    fn total(&self) -> SyncResult<usize>;

    /// Deletes every piece of persisted module state.
    fn reset_data(&self) -> SyncResult<()>;
}
