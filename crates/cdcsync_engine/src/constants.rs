//! Change detection and full sync for named runtime constants.

use crate::allowlist::Allowlist;
use crate::checksum_store::{ChecksumRecord, ChecksumStore};
use crate::config::{ConstantsConfig, ModuleScope};
use crate::enumerator::{Entities, EntityEnumerator};
use crate::error::SyncResult;
use crate::listeners::{
    ChangeEvent, ChangeHandler, FullSyncEvent, FullSyncHandler, FullSyncPayload, ListenerRegistry,
};
use crate::lock::DebounceLock;
use crate::module::{FullSyncState, SendStatus, SyncContext, SyncModule};
use crate::sender::Sender;
use crate::source::EntitySource;
use cdcsync_codec::checksum;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Module name.
pub const CONSTANTS_MODULE: &str = "constants";

/// Event a changed constant is emitted under.
pub const SYNC_CONSTANT_EVENT: &str = "sync_constant";

/// The module's only full-sync action.
pub const FULL_SYNC_CONSTANTS_ACTION: &str = "full_sync_constants";

/// What one [`ConstantsModule::maybe_detect_changes`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectOutcome {
    /// The debounce lock was held; nothing was read.
    Skipped,
    /// The allowlist is empty.
    Empty,
    /// Every constant was compared against its stored checksum.
    Detected {
        /// Change events emitted.
        emitted: usize,
        /// Constants compared.
        checked: usize,
    },
}

/// Sync module for an allowlist of named constants.
///
/// Change detection runs at most once per wait time. Each run diffs every
/// allowlisted constant against the persisted checksum record and emits a
/// [`ChangeEvent`] for each non-null constant whose checksum is new or
/// different.
///
/// Null constants never produce events. A null constant that already has
/// a stored checksum keeps it, so a constant that goes away and comes
/// back with its old value stays silent.
pub struct ConstantsModule {
    allowlist: RwLock<Allowlist>,
    wait_time: Duration,
    await_key: String,
    checksums: ChecksumStore,
    lock: DebounceLock,
    enumerator: EntityEnumerator,
    listeners: Arc<ListenerRegistry>,
}

impl ConstantsModule {
    /// Creates the module reading constants from `source`.
    pub fn new(config: ConstantsConfig, ctx: &SyncContext, source: Arc<dyn EntitySource>) -> Self {
        Self {
            allowlist: RwLock::new(config.allowlist),
            wait_time: config.wait_time,
            checksums: ChecksumStore::new(ctx.store.clone(), config.checksum_key),
            lock: DebounceLock::new(ctx.store.clone(), ctx.clock.clone()),
            await_key: config.await_key,
            enumerator: EntityEnumerator::new(source),
            listeners: ctx.listeners.clone(),
        }
    }

    /// Returns a copy of the current allowlist.
    pub fn allowlist(&self) -> Allowlist {
        self.allowlist.read().clone()
    }

    /// Replaces the allowlist.
    pub fn set_allowlist(&self, allowlist: Allowlist) {
        *self.allowlist.write() = allowlist;
    }

    /// Debounce window between two detections.
    pub fn wait_time(&self) -> Duration {
        self.wait_time
    }

    /// Current value of every allowlisted constant, in allowlist order.
    pub fn all_constants(&self) -> Entities {
        self.enumerator.enumerate(&self.allowlist.read())
    }

    /// The persisted checksum record.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn checksums(&self) -> SyncResult<ChecksumRecord> {
        self.checksums.get_all()
    }

    /// Emits changed constants unless a detection ran within the wait time.
    ///
    /// # Errors
    ///
    /// Store and listener failures propagate. A listener failure leaves
    /// the checksum record unsaved, so the next run retries the rest.
    pub fn maybe_detect_changes(&self) -> SyncResult<DetectOutcome> {
        if !self.lock.try_acquire(&self.await_key, self.wait_time)? {
            trace!(module = CONSTANTS_MODULE, "detection debounced");
            return Ok(DetectOutcome::Skipped);
        }

        let constants = self.all_constants();
        if constants.is_empty() {
            return Ok(DetectOutcome::Empty);
        }

        let mut record = self.checksums.get_all()?;
        let mut emitted = 0;
        for (name, value) in &constants {
            let sum = checksum(value);
            if value.is_null() {
                if !record.contains(name) {
                    record.insert(name.as_str(), sum);
                }
                continue;
            }

            if !record.is_unchanged(name, sum) {
                debug!(module = CONSTANTS_MODULE, entity = %name, "constant changed");
                self.listeners
                    .emit(SYNC_CONSTANT_EVENT, &ChangeEvent::new(name.as_str(), value.clone()))?;
                emitted += 1;
            }
            record.insert(name.as_str(), sum);
        }
        self.checksums.save(&record)?;

        debug!(
            module = CONSTANTS_MODULE,
            emitted,
            checked = constants.len(),
            "change detection finished"
        );
        Ok(DetectOutcome::Detected {
            emitted,
            checked: constants.len(),
        })
    }

    /// Reads every constant and records all their checksums, replacing
    /// the stored record wholesale.
    fn expand(&self) -> SyncResult<Entities> {
        let constants = self.all_constants();
        let mut record = ChecksumRecord::new();
        for (name, value) in &constants {
            record.insert(name.as_str(), checksum(value));
        }
        self.checksums.save(&record)?;
        Ok(constants)
    }
}

impl SyncModule for ConstantsModule {
    fn name(&self) -> &str {
        CONSTANTS_MODULE
    }

    fn init_listeners(&self, handler: ChangeHandler) {
        self.listeners.register(SYNC_CONSTANT_EVENT, handler);
    }

    fn init_full_sync_listeners(&self, handler: FullSyncHandler) {
        self.listeners
            .register_full_sync(FULL_SYNC_CONSTANTS_ACTION, handler);
    }

    fn before_send(&self) -> SyncResult<()> {
        self.maybe_detect_changes().map(|_| ())
    }

    fn expand_full_sync_payload(
        &self,
        action: &str,
        payload: FullSyncPayload,
    ) -> SyncResult<FullSyncPayload> {
        if action != FULL_SYNC_CONSTANTS_ACTION {
            return Ok(payload);
        }
        match payload {
            FullSyncPayload::Expand(true) => Ok(FullSyncPayload::Entities(self.expand()?)),
            other => Ok(other),
        }
    }

    fn estimate_full_sync_actions(&self, _scope: &ModuleScope) -> SyncResult<usize> {
        Ok(self.enumerator.count(&self.allowlist.read()))
    }

    fn enqueue_full_sync_actions(
        &self,
        _scope: &ModuleScope,
        _max_items: usize,
        _state: FullSyncState,
    ) -> SyncResult<(usize, FullSyncState)> {
        // All constants travel as one expandable action.
        let event = FullSyncEvent::new(FULL_SYNC_CONSTANTS_ACTION, FullSyncPayload::Expand(true));
        self.listeners
            .emit_full_sync(FULL_SYNC_CONSTANTS_ACTION, &event)?;
        debug!(module = CONSTANTS_MODULE, enqueued = 1, "full sync enqueued");
        Ok((1, FullSyncState::Done))
    }

    fn send_full_sync_actions(
        &self,
        _scope: &ModuleScope,
        _deadline: Duration,
        _state: FullSyncState,
        sender: &dyn Sender,
    ) -> SyncResult<SendStatus> {
        let payload = self.expand_full_sync_payload(
            FULL_SYNC_CONSTANTS_ACTION,
            FullSyncPayload::Expand(true),
        )?;
        sender.send_action(FULL_SYNC_CONSTANTS_ACTION, &payload)?;
        debug!(module = CONSTANTS_MODULE, "full sync sent");
        Ok(SendStatus::finished())
    }

    fn full_sync_actions(&self) -> Vec<String> {
        vec![FULL_SYNC_CONSTANTS_ACTION.to_string()]
    }

    fn total(&self) -> SyncResult<usize> {
        Ok(self.allowlist.read().len())
    }

    fn reset_data(&self) -> SyncResult<()> {
        self.checksums.reset()?;
        self.lock.release(&self.await_key)?;
        debug!(module = CONSTANTS_MODULE, "module data reset");
        Ok(())
    }
}

impl std::fmt::Debug for ConstantsModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstantsModule")
            .field("allowlist", &*self.allowlist.read())
            .field("wait_time", &self.wait_time)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::sender::MemorySender;
    use crate::source::MapSource;
    use cdcsync_codec::Value;
    use cdcsync_storage::{InMemoryStore, ManualClock};
    use parking_lot::Mutex;

    const WAIT: Duration = Duration::from_secs(60);

    struct Fixture {
        module: ConstantsModule,
        source: Arc<MapSource>,
        clock: Arc<ManualClock>,
        changes: Arc<Mutex<Vec<ChangeEvent>>>,
    }

    fn fixture(names: &[&str]) -> Fixture {
        let clock = Arc::new(ManualClock::new(Duration::from_secs(1)));
        let store = Arc::new(InMemoryStore::with_clock(clock.clone()));
        let ctx = SyncContext::new(store, clock.clone());
        let source = Arc::new(MapSource::new());
        let config =
            ConstantsConfig::new(names.iter().copied().collect()).with_wait_time(WAIT);
        let module = ConstantsModule::new(config, &ctx, source.clone());

        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink = changes.clone();
        module.init_listeners(Arc::new(move |event: &ChangeEvent| {
            sink.lock().push(event.clone());
            Ok(())
        }));

        Fixture {
            module,
            source,
            clock,
            changes,
        }
    }

    impl Fixture {
        fn detect_after_wait(&self) -> DetectOutcome {
            self.clock.advance(WAIT);
            self.module.maybe_detect_changes().unwrap()
        }

        fn take_changes(&self) -> Vec<ChangeEvent> {
            std::mem::take(&mut *self.changes.lock())
        }
    }

    #[test]
    fn first_detection_emits_every_defined_constant() {
        let fx = fixture(&["WP_DEBUG", "PHP_VERSION", "UNDEFINED"]);
        fx.source.set("WP_DEBUG", true);
        fx.source.set("PHP_VERSION", "8.1");

        let outcome = fx.module.maybe_detect_changes().unwrap();
        assert_eq!(
            outcome,
            DetectOutcome::Detected {
                emitted: 2,
                checked: 3
            }
        );
        assert_eq!(
            fx.take_changes(),
            vec![
                ChangeEvent::new("WP_DEBUG", Value::Bool(true)),
                ChangeEvent::new("PHP_VERSION", Value::from("8.1")),
            ]
        );

        let record = fx.module.checksums().unwrap();
        assert_eq!(record.len(), 3);
        assert!(record.contains("UNDEFINED"));
    }

    #[test]
    fn second_call_within_wait_time_is_skipped() {
        let fx = fixture(&["A"]);
        fx.source.set("A", 1);
        fx.module.maybe_detect_changes().unwrap();

        fx.source.set("A", 2);
        assert_eq!(
            fx.module.maybe_detect_changes().unwrap(),
            DetectOutcome::Skipped
        );
        assert_eq!(fx.take_changes(), vec![ChangeEvent::new("A", Value::Int(1))]);
    }

    #[test]
    fn changed_value_is_emitted_once() {
        let fx = fixture(&["A", "B"]);
        fx.source.set("A", 1);
        fx.source.set("B", 1);
        fx.module.maybe_detect_changes().unwrap();
        fx.take_changes();

        fx.source.set("A", 2);
        assert_eq!(
            fx.detect_after_wait(),
            DetectOutcome::Detected {
                emitted: 1,
                checked: 2
            }
        );
        assert_eq!(fx.take_changes(), vec![ChangeEvent::new("A", Value::Int(2))]);

        fx.detect_after_wait();
        assert!(fx.take_changes().is_empty());
    }

    #[test]
    fn null_then_value_emits_once() {
        let fx = fixture(&["A"]);
        fx.module.maybe_detect_changes().unwrap();
        assert!(fx.take_changes().is_empty());

        fx.source.set("A", "x");
        fx.detect_after_wait();
        assert_eq!(fx.take_changes(), vec![ChangeEvent::new("A", Value::from("x"))]);
    }

    #[test]
    fn value_null_value_roundtrip_is_silent() {
        let fx = fixture(&["A"]);
        fx.source.set("A", "x");
        fx.module.maybe_detect_changes().unwrap();
        assert_eq!(fx.take_changes().len(), 1);

        fx.source.unset("A");
        fx.detect_after_wait();
        assert!(fx.take_changes().is_empty());

        fx.source.set("A", "x");
        fx.detect_after_wait();
        assert!(fx.take_changes().is_empty());
    }

    #[test]
    fn empty_allowlist_does_nothing() {
        let fx = fixture(&[]);
        assert_eq!(fx.module.maybe_detect_changes().unwrap(), DetectOutcome::Empty);
        assert!(fx.module.checksums().unwrap().is_empty());
    }

    #[test]
    fn allowlist_can_change_at_runtime() {
        let fx = fixture(&["A"]);
        fx.source.set("A", 1);
        fx.source.set("B", 2);
        fx.module.maybe_detect_changes().unwrap();
        fx.take_changes();

        let mut allowlist = fx.module.allowlist();
        allowlist.insert("B");
        fx.module.set_allowlist(allowlist);
        assert_eq!(fx.module.total().unwrap(), 2);

        fx.detect_after_wait();
        assert_eq!(fx.take_changes(), vec![ChangeEvent::new("B", Value::Int(2))]);
    }

    #[test]
    fn listener_failure_propagates_and_keeps_record() {
        let fx = fixture(&["A"]);
        fx.source.set("A", 1);
        fx.module.init_listeners(Arc::new(|event: &ChangeEvent| {
            Err(SyncError::listener(SYNC_CONSTANT_EVENT, format!("rejected {}", event.name)))
        }));

        let err = fx.module.maybe_detect_changes().unwrap_err();
        assert!(matches!(err, SyncError::Listener { .. }));
        assert!(fx.module.checksums().unwrap().is_empty());
    }

    #[test]
    fn reset_makes_everything_new() {
        let fx = fixture(&["A"]);
        fx.source.set("A", 1);
        fx.module.maybe_detect_changes().unwrap();
        fx.take_changes();

        fx.module.reset_data().unwrap();
        assert!(fx.module.checksums().unwrap().is_empty());

        // The lock is gone too, no need to wait.
        fx.module.maybe_detect_changes().unwrap();
        assert_eq!(fx.take_changes(), vec![ChangeEvent::new("A", Value::Int(1))]);
    }

    #[test]
    fn enqueue_is_a_single_unit() {
        let fx = fixture(&["A", "B", "C"]);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        fx.module
            .init_full_sync_listeners(Arc::new(move |event: &FullSyncEvent| {
                sink.lock().push(event.clone());
                Ok(())
            }));

        assert_eq!(
            fx.module
                .estimate_full_sync_actions(&ModuleScope::All)
                .unwrap(),
            3
        );
        for max_items in [0, 1, 100] {
            let result = fx
                .module
                .enqueue_full_sync_actions(&ModuleScope::All, max_items, FullSyncState::Pending)
                .unwrap();
            assert_eq!(result, (1, FullSyncState::Done));
        }
        let events = events.lock();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0],
            FullSyncEvent::new(FULL_SYNC_CONSTANTS_ACTION, FullSyncPayload::Expand(true))
        );
        assert_eq!(fx.module.full_sync_actions(), vec![FULL_SYNC_CONSTANTS_ACTION]);
    }

    #[test]
    fn expand_refreshes_every_checksum() {
        let fx = fixture(&["A", "B"]);
        fx.source.set("A", 1);

        let expanded = fx
            .module
            .expand_full_sync_payload(FULL_SYNC_CONSTANTS_ACTION, FullSyncPayload::Expand(true))
            .unwrap();
        assert_eq!(
            expanded,
            FullSyncPayload::Entities(vec![
                ("A".to_string(), Value::Int(1)),
                ("B".to_string(), Value::Null),
            ])
        );
        let record = fx.module.checksums().unwrap();
        assert!(record.is_unchanged("A", checksum(&Value::Int(1))));
        assert!(record.is_unchanged("B", checksum(&Value::Null)));

        // Detection after a full sync has nothing new to report.
        fx.module.maybe_detect_changes().unwrap();
        assert!(fx.take_changes().is_empty());
    }

    #[test]
    fn expand_passes_other_payloads_through() {
        let fx = fixture(&["A"]);
        let untouched = fx
            .module
            .expand_full_sync_payload(FULL_SYNC_CONSTANTS_ACTION, FullSyncPayload::Expand(false))
            .unwrap();
        assert_eq!(untouched, FullSyncPayload::Expand(false));

        let foreign = fx
            .module
            .expand_full_sync_payload("full_sync_posts", FullSyncPayload::Expand(true))
            .unwrap();
        assert_eq!(foreign, FullSyncPayload::Expand(true));
        assert!(fx.module.checksums().unwrap().is_empty());
    }

    #[test]
    fn send_delivers_expanded_constants() {
        let fx = fixture(&["A"]);
        fx.source.set("A", true);
        let sender = MemorySender::new();

        let status = fx
            .module
            .send_full_sync_actions(
                &ModuleScope::All,
                Duration::ZERO,
                FullSyncState::Pending,
                &sender,
            )
            .unwrap();
        assert!(status.finished);

        let sent = sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].action, FULL_SYNC_CONSTANTS_ACTION);
        assert_eq!(
            sent[0].payload,
            FullSyncPayload::Entities(vec![("A".to_string(), Value::Bool(true))])
        );
        assert!(fx.module.checksums().unwrap().contains("A"));
    }

    #[test]
    fn before_send_runs_detection() {
        let fx = fixture(&["A"]);
        fx.source.set("A", 1);
        fx.module.before_send().unwrap();
        assert_eq!(fx.take_changes().len(), 1);
    }
}
