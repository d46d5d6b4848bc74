//! Immediate-send seam for full sync.

use crate::error::{SyncError, SyncResult};
use crate::listeners::FullSyncPayload;
use parking_lot::Mutex;

/// Delivers full-sync actions straight to the remote consumer, bypassing
/// the listener queue.
pub trait Sender: Send + Sync {
    /// Sends one action with its (already expanded) payload.
    fn send_action(&self, action: &str, payload: &FullSyncPayload) -> SyncResult<()>;
}

/// An action handed to a [`MemorySender`].
#[derive(Debug, Clone, PartialEq)]
pub struct SentAction {
    /// Action name.
    pub action: String,
    /// Payload as sent.
    pub payload: FullSyncPayload,
}

/// A sender that records actions in memory, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySender {
    sent: Mutex<Vec<SentAction>>,
    failure: Mutex<Option<bool>>,
}

impl MemorySender {
    /// Creates an empty sender.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following send fail with a transport error.
    pub fn fail_with(&self, retryable: bool) {
        *self.failure.lock() = Some(retryable);
    }

    /// Lets sends succeed again.
    pub fn recover(&self) {
        *self.failure.lock() = None;
    }

    /// Returns every action sent so far.
    pub fn sent(&self) -> Vec<SentAction> {
        self.sent.lock().clone()
    }

    /// Removes and returns every action sent so far.
    pub fn take(&self) -> Vec<SentAction> {
        std::mem::take(&mut *self.sent.lock())
    }
}

impl Sender for MemorySender {
    fn send_action(&self, action: &str, payload: &FullSyncPayload) -> SyncResult<()> {
        match *self.failure.lock() {
            Some(true) => return Err(SyncError::transport_retryable("sender unavailable")),
            Some(false) => return Err(SyncError::transport_fatal("sender rejected action")),
            None => {}
        }
        self.sent.lock().push(SentAction {
            action: action.to_string(),
            payload: payload.clone(),
        });
        Ok(())
    }
}
