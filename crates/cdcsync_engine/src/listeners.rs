//! Typed publish-subscribe between sync modules and the transport.
//!
//! Change events and full-sync events have separate handler tables so a
//! handler only ever sees the payload shape it was registered for.
//! Emission is synchronous, on the calling thread, in registration order.
//! The first failing handler stops emission and its error reaches the
//! emitter.

use crate::enumerator::Entities;
use crate::error::SyncResult;
use cdcsync_codec::Value;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// One monitored entity's current value.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    /// Entity name.
    pub name: String,
    /// Current value. Never null when emitted by a change detector.
    pub value: Value,
}

impl ChangeEvent {
    /// Creates a change event.
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// What a full-sync action carries.
#[derive(Debug, Clone, PartialEq)]
pub enum FullSyncPayload {
    /// Placeholder asking the sender to expand the module's state.
    Expand(bool),
    /// The expanded state: every monitored entity and its value.
    Entities(Entities),
}

/// A full-sync action as seen by listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct FullSyncEvent {
    /// Action name, one of the owning module's full-sync actions.
    pub action: String,
    /// Action payload.
    pub payload: FullSyncPayload,
}

impl FullSyncEvent {
    /// Creates a full-sync event.
    pub fn new(action: impl Into<String>, payload: FullSyncPayload) -> Self {
        Self {
            action: action.into(),
            payload,
        }
    }
}

/// Handler for change events.
pub type ChangeHandler = Arc<dyn Fn(&ChangeEvent) -> SyncResult<()> + Send + Sync>;

/// Handler for full-sync events.
pub type FullSyncHandler = Arc<dyn Fn(&FullSyncEvent) -> SyncResult<()> + Send + Sync>;

/// Handler table for one payload type.
struct Listeners<E: ?Sized> {
    handlers: RwLock<HashMap<String, Vec<Arc<dyn Fn(&E) -> SyncResult<()> + Send + Sync>>>>,
}

impl<E: ?Sized> Listeners<E> {
    fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    fn register(&self, event: &str, handler: Arc<dyn Fn(&E) -> SyncResult<()> + Send + Sync>) {
        self.handlers
            .write()
            .entry(event.to_string())
            .or_default()
            .push(handler);
    }

    fn emit(&self, event: &str, payload: &E) -> SyncResult<usize> {
        // Snapshot so handlers may register further listeners.
        let handlers = match self.handlers.read().get(event) {
            Some(handlers) => handlers.clone(),
            None => return Ok(0),
        };
        for handler in &handlers {
            handler(payload)?;
        }
        Ok(handlers.len())
    }

    fn count(&self, event: &str) -> usize {
        self.handlers.read().get(event).map_or(0, Vec::len)
    }

    fn clear(&self) {
        self.handlers.write().clear();
    }
}

/// Registry of change and full-sync listeners.
///
/// One instance is shared, behind an [`Arc`], by every module of a
/// process; there is no global registry.
pub struct ListenerRegistry {
    changes: Listeners<ChangeEvent>,
    full_sync: Listeners<FullSyncEvent>,
}

impl ListenerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            changes: Listeners::new(),
            full_sync: Listeners::new(),
        }
    }

    /// Registers a change handler under `event`.
    pub fn register(&self, event: &str, handler: ChangeHandler) {
        self.changes.register(event, handler);
    }

    /// Registers a full-sync handler under `event`.
    pub fn register_full_sync(&self, event: &str, handler: FullSyncHandler) {
        self.full_sync.register(event, handler);
    }

    /// Calls every change handler registered under `event`.
    ///
    /// Returns how many handlers ran.
    ///
    /// # Errors
    ///
    /// Returns the first handler error; later handlers are not called.
    pub fn emit(&self, event: &str, change: &ChangeEvent) -> SyncResult<usize> {
        self.changes.emit(event, change)
    }

    /// Calls every full-sync handler registered under `event`.
    ///
    /// # Errors
    ///
    /// Returns the first handler error; later handlers are not called.
    pub fn emit_full_sync(&self, event: &str, full_sync: &FullSyncEvent) -> SyncResult<usize> {
        self.full_sync.emit(event, full_sync)
    }

    /// Number of change handlers under `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.changes.count(event)
    }

    /// Number of full-sync handlers under `event`.
    pub fn full_sync_listener_count(&self, event: &str) -> usize {
        self.full_sync.count(event)
    }

    /// Removes every handler.
    pub fn clear(&self) {
        self.changes.clear();
        self.full_sync.clear();
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use parking_lot::Mutex;

    #[test]
    fn emit_without_listeners_is_noop() {
        let registry = ListenerRegistry::new();
        let ran = registry
            .emit("sync_constant", &ChangeEvent::new("A", Value::Int(1)))
            .unwrap();
        assert_eq!(ran, 0);
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let registry = ListenerRegistry::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let calls = calls.clone();
            registry.register(
                "sync_constant",
                Arc::new(move |event: &ChangeEvent| {
                    calls.lock().push(format!("{tag}:{}", event.name));
                    Ok(())
                }),
            );
        }

        let ran = registry
            .emit("sync_constant", &ChangeEvent::new("WP_DEBUG", Value::Bool(true)))
            .unwrap();
        assert_eq!(ran, 3);
        assert_eq!(
            *calls.lock(),
            vec!["first:WP_DEBUG", "second:WP_DEBUG", "third:WP_DEBUG"]
        );
    }

    #[test]
    fn failing_handler_stops_emission() {
        let registry = ListenerRegistry::new();
        let later = Arc::new(Mutex::new(0));

        registry.register(
            "sync_constant",
            Arc::new(|event: &ChangeEvent| Err(SyncError::listener("sync_constant", &event.name))),
        );
        let counter = later.clone();
        registry.register(
            "sync_constant",
            Arc::new(move |_: &ChangeEvent| {
                *counter.lock() += 1;
                Ok(())
            }),
        );

        let result = registry.emit("sync_constant", &ChangeEvent::new("A", Value::Null));
        assert!(matches!(result, Err(SyncError::Listener { .. })));
        assert_eq!(*later.lock(), 0);
    }

    #[test]
    fn change_and_full_sync_tables_are_separate() {
        let registry = ListenerRegistry::new();
        registry.register("shared", Arc::new(|_: &ChangeEvent| Ok(())));
        registry.register_full_sync("shared", Arc::new(|_: &FullSyncEvent| Ok(())));
        registry.register_full_sync("shared", Arc::new(|_: &FullSyncEvent| Ok(())));

        assert_eq!(registry.listener_count("shared"), 1);
        assert_eq!(registry.full_sync_listener_count("shared"), 2);

        let event = FullSyncEvent::new("shared", FullSyncPayload::Expand(true));
        assert_eq!(registry.emit_full_sync("shared", &event).unwrap(), 2);

        registry.clear();
        assert_eq!(registry.listener_count("shared"), 0);
        assert_eq!(registry.full_sync_listener_count("shared"), 0);
    }

    #[test]
    fn handler_may_register_during_emit() {
        let registry = Arc::new(ListenerRegistry::new());
        let inner = registry.clone();
        registry.register(
            "e",
            Arc::new(move |_: &ChangeEvent| {
                inner.register("e", Arc::new(|_: &ChangeEvent| Ok(())));
                Ok(())
            }),
        );

        assert_eq!(registry.emit("e", &ChangeEvent::new("A", Value::Null)).unwrap(), 1);
        assert_eq!(registry.listener_count("e"), 2);
    }
}
