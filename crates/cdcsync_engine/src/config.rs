//! Configuration for the constants module and full sync.

use crate::allowlist::Allowlist;
use std::collections::HashMap;
use std::time::Duration;

/// Default debounce window between two change detections.
pub const DEFAULT_CONSTANTS_WAIT_TIME: Duration = Duration::from_secs(60 * 60);

/// Store key of the persisted checksum record.
pub const CONSTANTS_CHECKSUM_KEY: &str = "constants_sync_checksum";

/// Store key of the debounce lock.
pub const CONSTANTS_AWAIT_KEY: &str = "sync_constants_await";

/// Default number of items a full-sync enqueue step may produce.
pub const DEFAULT_MAX_ENQUEUE_ITEMS: usize = 100;

/// Runtime constants monitored when no allowlist is configured.
pub const DEFAULT_CONSTANTS_ALLOWLIST: &[&str] = &[
    "EMPTY_TRASH_DAYS",
    "WP_POST_REVISIONS",
    "AUTOMATIC_UPDATER_DISABLED",
    "ABSPATH",
    "WP_CONTENT_DIR",
    "FS_METHOD",
    "DISALLOW_FILE_EDIT",
    "DISALLOW_FILE_MODS",
    "WP_AUTO_UPDATE_CORE",
    "WP_HTTP_BLOCK_EXTERNAL",
    "WP_ACCESSIBLE_HOSTS",
    "DISABLE_WP_CRON",
    "ALTERNATE_WP_CRON",
    "WP_CRON_LOCK_TIMEOUT",
    "PHP_VERSION",
    "WP_MEMORY_LIMIT",
    "WP_MAX_MEMORY_LIMIT",
    "WP_DEBUG",
    "WP_DEBUG_LOG",
    "WP_DEBUG_DISPLAY",
    "SCRIPT_DEBUG",
    "WP_CACHE",
    "WP_ENVIRONMENT_TYPE",
    "FORCE_SSL_ADMIN",
    "IS_PRESSABLE",
    "DISABLE_WP_CRON_TESTING",
];

/// Configuration for the constants module.
#[derive(Debug, Clone)]
pub struct ConstantsConfig {
    /// Names of the monitored constants, in emission order.
    pub allowlist: Allowlist,
    /// Debounce window between two change detections.
    pub wait_time: Duration,
    /// Store key of the checksum record.
    pub checksum_key: String,
    /// Store key of the debounce lock.
    pub await_key: String,
}

impl ConstantsConfig {
    /// Creates a configuration monitoring `allowlist`.
    pub fn new(allowlist: Allowlist) -> Self {
        Self {
            allowlist,
            wait_time: DEFAULT_CONSTANTS_WAIT_TIME,
            checksum_key: CONSTANTS_CHECKSUM_KEY.to_string(),
            await_key: CONSTANTS_AWAIT_KEY.to_string(),
        }
    }

    /// Sets the debounce window.
    pub fn with_wait_time(mut self, wait_time: Duration) -> Self {
        self.wait_time = wait_time;
        self
    }

    /// Sets the store key of the checksum record.
    pub fn with_checksum_key(mut self, key: impl Into<String>) -> Self {
        self.checksum_key = key.into();
        self
    }

    /// Sets the store key of the debounce lock.
    pub fn with_await_key(mut self, key: impl Into<String>) -> Self {
        self.await_key = key.into();
        self
    }
}

impl Default for ConstantsConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CONSTANTS_ALLOWLIST.iter().copied().collect())
    }
}

/// Which objects of a module a full sync covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ModuleScope {
    /// Everything the module monitors.
    #[default]
    All,
    /// Only the listed object identifiers.
    Only(Vec<String>),
}

/// Configuration for a full-sync run.
#[derive(Debug, Clone)]
pub struct FullSyncConfig {
    /// Item budget of a single enqueue step, at least 1.
    pub max_enqueue_items: usize,
    /// Modules to sync, in order. `None` means every registered module.
    pub modules: Option<Vec<String>>,
    /// Per-module scope. Modules without an entry sync everything.
    pub scopes: HashMap<String, ModuleScope>,
}

impl FullSyncConfig {
    /// Creates a configuration syncing every module with default budgets.
    pub fn new() -> Self {
        Self {
            max_enqueue_items: DEFAULT_MAX_ENQUEUE_ITEMS,
            modules: None,
            scopes: HashMap::new(),
        }
    }

    /// Sets the item budget of a single enqueue step.
    ///
    /// Zero is raised to one so every step makes progress.
    pub fn with_max_enqueue_items(mut self, items: usize) -> Self {
        self.max_enqueue_items = items.max(1);
        self
    }

    /// Restricts the run to the named modules.
    pub fn with_modules<S: Into<String>>(mut self, modules: impl IntoIterator<Item = S>) -> Self {
        self.modules = Some(modules.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the scope of one module.
    pub fn with_scope(mut self, module: impl Into<String>, scope: ModuleScope) -> Self {
        self.scopes.insert(module.into(), scope);
        self
    }

    /// Returns the scope for `module`.
    pub fn scope_for(&self, module: &str) -> ModuleScope {
        self.scopes.get(module).cloned().unwrap_or_default()
    }
}

impl Default for FullSyncConfig {
    fn default() -> Self {
        Self::new()
    }
}
