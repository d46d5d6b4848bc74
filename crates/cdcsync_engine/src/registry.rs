//! Explicit, per-process collection of sync modules.

use crate::error::{SyncError, SyncResult};
use crate::listeners::{ChangeHandler, FullSyncHandler, FullSyncPayload};
use crate::module::SyncModule;
use std::sync::Arc;
use tracing::debug;

/// The sync modules of one process, in registration order.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn SyncModule>>,
}

impl ModuleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a module.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::DuplicateModule`] if the name is taken.
    pub fn register(&mut self, module: Arc<dyn SyncModule>) -> SyncResult<()> {
        if self.get(module.name()).is_some() {
            return Err(SyncError::DuplicateModule(module.name().to_string()));
        }
        debug!(module = module.name(), "sync module registered");
        self.modules.push(module);
        Ok(())
    }

    /// Looks a module up by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn SyncModule>> {
        self.modules.iter().find(|m| m.name() == name).cloned()
    }

    /// Looks a module up by name, failing if absent.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownModule`] if no module has that name.
    pub fn require(&self, name: &str) -> SyncResult<Arc<dyn SyncModule>> {
        self.get(name)
            .ok_or_else(|| SyncError::UnknownModule(name.to_string()))
    }

    /// Module names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.modules.iter().map(|m| m.name().to_string()).collect()
    }

    /// Iterates modules in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn SyncModule>> {
        self.modules.iter()
    }

    /// Number of modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Returns true if no module is registered.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Registers `handler` for every module's change events.
    pub fn init_listeners(&self, handler: ChangeHandler) {
        for module in &self.modules {
            module.init_listeners(handler.clone());
        }
    }

    /// Registers `handler` for every module's full-sync events.
    pub fn init_full_sync_listeners(&self, handler: FullSyncHandler) {
        for module in &self.modules {
            module.init_full_sync_listeners(handler.clone());
        }
    }

    /// Runs every module's before-send hook.
    ///
    /// # Errors
    ///
    /// Stops at the first failing module.
    pub fn before_send(&self) -> SyncResult<()> {
        for module in &self.modules {
            module.before_send()?;
        }
        Ok(())
    }

    /// Lets the module owning `action` expand its payload.
    ///
    /// Payloads of actions no module owns pass through untouched.
    ///
    /// # Errors
    ///
    /// Propagates the owning module's failure.
    pub fn expand_full_sync_payload(
        &self,
        action: &str,
        payload: FullSyncPayload,
    ) -> SyncResult<FullSyncPayload> {
        let owner = self
            .modules
            .iter()
            .find(|m| m.full_sync_actions().iter().any(|a| a == action));
        match owner {
            Some(module) => module.expand_full_sync_payload(action, payload),
            None => Ok(payload),
        }
    }

    /// Every module's full-sync action names.
    pub fn full_sync_actions(&self) -> Vec<String> {
        self.modules
            .iter()
            .flat_map(|m| m.full_sync_actions())
            .collect()
    }

    /// Resets every module's persisted state.
    ///
    /// # Errors
    ///
    /// Stops at the first failing module.
    pub fn reset_all(&self) -> SyncResult<()> {
        for module in &self.modules {
            module.reset_data()?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.names())
            .finish()
    }
}
