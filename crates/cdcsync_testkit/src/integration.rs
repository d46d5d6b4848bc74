//! Cross-crate harnesses wiring the engine to deterministic collaborators.

use crate::fixtures::{CountingSource, RecordingListener};
use cdcsync_codec::Value;
use cdcsync_engine::{
    ChangeEvent, ChangeHandler, ConstantsConfig, ConstantsModule, DetectOutcome, FullSyncHandler,
    FullSyncPayload, FullSyncState, ModuleScope, SendStatus, Sender, SyncContext, SyncModule,
    SyncResult,
};
use cdcsync_storage::{InMemoryStore, KeyValueStore, ManualClock};
use std::sync::Arc;
use std::time::Duration;

/// Debounce window used by [`ConstantsHarness`].
pub const HARNESS_WAIT: Duration = Duration::from_secs(30);

/// A constants module on a manual clock, an in-memory store and a
/// counting source, with a recorder subscribed to all its events.
pub struct ConstantsHarness {
    /// The module under test.
    pub module: Arc<ConstantsModule>,
    /// Source the module reads.
    pub source: Arc<CountingSource>,
    /// Clock shared by the store and the module.
    pub clock: Arc<ManualClock>,
    /// Store backing the module.
    pub store: Arc<dyn KeyValueStore>,
    /// Recorder subscribed to change and full-sync events.
    pub recorder: RecordingListener,
}

impl ConstantsHarness {
    /// Creates a harness monitoring `allowlist` with an empty store.
    pub fn new(allowlist: &[&str]) -> Self {
        let clock = Arc::new(ManualClock::new(Duration::from_secs(1_700_000_000)));
        let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::with_clock(clock.clone()));
        Self::with_store(allowlist, store, clock)
    }

    /// Creates a harness over an existing store and clock.
    pub fn with_store(
        allowlist: &[&str],
        store: Arc<dyn KeyValueStore>,
        clock: Arc<ManualClock>,
    ) -> Self {
        let ctx = SyncContext::new(store.clone(), clock.clone());
        let source = Arc::new(CountingSource::new());
        let config = ConstantsConfig::new(allowlist.iter().copied().collect())
            .with_wait_time(HARNESS_WAIT);
        let module = Arc::new(ConstantsModule::new(config, &ctx, source.clone()));

        let recorder = RecordingListener::new();
        module.init_listeners(recorder.change_handler());
        module.init_full_sync_listeners(recorder.full_sync_handler());

        Self {
            module,
            source,
            clock,
            store,
            recorder,
        }
    }

    /// Defines or redefines a constant.
    pub fn set(&self, name: &str, value: impl Into<Value>) {
        self.source.set(name, value);
    }

    /// Undefines a constant.
    pub fn unset(&self, name: &str) {
        self.source.unset(name);
    }

    /// Runs detection now.
    pub fn detect(&self) -> DetectOutcome {
        self.module
            .maybe_detect_changes()
            .expect("change detection failed")
    }

    /// Lets the debounce window pass, then runs detection.
    pub fn detect_after_wait(&self) -> DetectOutcome {
        self.clock.advance(HARNESS_WAIT);
        self.detect()
    }

    /// Removes and returns the change events emitted so far.
    pub fn take_changes(&self) -> Vec<ChangeEvent> {
        self.recorder.take_changes()
    }
}

/// A fake module handing out `items` numbered objects a page at a time.
///
/// Useful for exercising full-sync budgets next to the single-unit
/// constants module.
#[derive(Debug)]
pub struct PagedModule {
    name: String,
    items: u64,
}

impl PagedModule {
    /// Creates a module called `name` with `items` objects.
    pub fn new(name: impl Into<String>, items: u64) -> Self {
        Self {
            name: name.into(),
            items,
        }
    }

    fn action(&self) -> String {
        format!("full_sync_{}", self.name)
    }

    fn selected(&self, scope: &ModuleScope) -> u64 {
        match scope {
            ModuleScope::All => self.items,
            ModuleScope::Only(ids) => ids.len() as u64,
        }
    }

    fn cursor(state: FullSyncState) -> Option<u64> {
        match state {
            FullSyncState::Pending => Some(0),
            FullSyncState::Cursor(at) => Some(at),
            FullSyncState::Done => None,
        }
    }
}

impl SyncModule for PagedModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn init_listeners(&self, _handler: ChangeHandler) {}

    fn init_full_sync_listeners(&self, _handler: FullSyncHandler) {}

    fn estimate_full_sync_actions(&self, scope: &ModuleScope) -> SyncResult<usize> {
        Ok(self.selected(scope) as usize)
    }

    fn enqueue_full_sync_actions(
        &self,
        scope: &ModuleScope,
        max_items: usize,
        state: FullSyncState,
    ) -> SyncResult<(usize, FullSyncState)> {
        let Some(from) = Self::cursor(state) else {
            return Ok((0, FullSyncState::Done));
        };
        let total = self.selected(scope);
        let to = (from + max_items as u64).min(total);
        let next = if to >= total {
            FullSyncState::Done
        } else {
            FullSyncState::Cursor(to)
        };
        Ok(((to - from) as usize, next))
    }

    fn send_full_sync_actions(
        &self,
        scope: &ModuleScope,
        _deadline: Duration,
        state: FullSyncState,
        sender: &dyn Sender,
    ) -> SyncResult<SendStatus> {
        let Some(from) = Self::cursor(state) else {
            return Ok(SendStatus::finished());
        };
        let total = self.selected(scope);
        if from < total {
            sender.send_action(&self.action(), &FullSyncPayload::Expand(true))?;
        }
        if from + 1 >= total {
            Ok(SendStatus::finished())
        } else {
            Ok(SendStatus::resume(FullSyncState::Cursor(from + 1)))
        }
    }

    fn full_sync_actions(&self) -> Vec<String> {
        vec![self.action()]
    }

    fn total(&self) -> SyncResult<usize> {
        Ok(self.items as usize)
    }

    fn reset_data(&self) -> SyncResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn harness_detects() {
        let harness = ConstantsHarness::new(&["A"]);
        harness.set("A", 1);
        assert_eq!(
            harness.detect(),
            DetectOutcome::Detected {
                emitted: 1,
                checked: 1
            }
        );
        assert_eq!(harness.detect(), DetectOutcome::Skipped);
        assert_eq!(harness.source.resolves(), 1);
    }

    #[test]
    fn paged_module_pages() {
        let module = PagedModule::new("posts", 5);
        let (n, state) = module
            .enqueue_full_sync_actions(&ModuleScope::All, 2, FullSyncState::Pending)
            .unwrap();
        assert_eq!((n, state), (2, FullSyncState::Cursor(2)));

        let (n, state) = module
            .enqueue_full_sync_actions(&ModuleScope::All, 10, state)
            .unwrap();
        assert_eq!((n, state), (3, FullSyncState::Done));

        let scoped = ModuleScope::Only(vec!["1".into(), "2".into()]);
        assert_eq!(module.estimate_full_sync_actions(&scoped).unwrap(), 2);
        assert_eq!(module.full_sync_actions(), vec!["full_sync_posts"]);
    }
}
