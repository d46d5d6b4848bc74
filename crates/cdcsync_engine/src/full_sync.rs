//! Full-sync orchestration across the module registry.
//!
//! A run has three phases:
//! 1. `start` estimates every selected module
//! 2. `enqueue_step` drains modules in order within an item budget, or
//!    `send_step` sends them immediately until a deadline
//! 3. the run completes once every module reports done
//!
//! A [`FullSyncRun`] is plain data, so callers may keep it between steps
//! and resume in a later request.

use crate::config::FullSyncConfig;
use crate::error::SyncResult;
use crate::module::FullSyncState;
use crate::registry::ModuleRegistry;
use crate::sender::Sender;
use cdcsync_storage::Clock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Progress of one module within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleProgress {
    /// Module name.
    pub module: String,
    /// Items the module expected to enqueue when the run started.
    pub estimated: usize,
    /// Items enqueued so far.
    pub enqueued: usize,
    /// State to hand back to the module on the next call.
    pub state: FullSyncState,
}

impl ModuleProgress {
    /// Returns true once the module has reported done.
    pub fn is_finished(&self) -> bool {
        self.state.is_done()
    }
}

/// State of one full-sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullSyncRun {
    started_at: Duration,
    finished_at: Option<Duration>,
    modules: Vec<ModuleProgress>,
}

impl FullSyncRun {
    /// Per-module progress, in sync order.
    pub fn progress(&self) -> &[ModuleProgress] {
        &self.modules
    }

    /// Progress of one module.
    pub fn module(&self, name: &str) -> Option<&ModuleProgress> {
        self.modules.iter().find(|p| p.module == name)
    }

    /// When the run started, per the driver's clock.
    pub fn started_at(&self) -> Duration {
        self.started_at
    }

    /// When the last module finished, if it has.
    pub fn finished_at(&self) -> Option<Duration> {
        self.finished_at
    }

    /// Returns true once every module has finished.
    pub fn is_finished(&self) -> bool {
        self.modules.iter().all(ModuleProgress::is_finished)
    }

    /// Sum of the modules' estimates.
    pub fn total_estimated(&self) -> usize {
        self.modules.iter().map(|p| p.estimated).sum()
    }

    /// Sum of items enqueued so far.
    pub fn total_enqueued(&self) -> usize {
        self.modules.iter().map(|p| p.enqueued).sum()
    }

    fn mark_finished(&mut self, now: Duration) {
        if self.finished_at.is_none() && self.is_finished() {
            self.finished_at = Some(now);
        }
    }
}

/// Drives full syncs over a [`ModuleRegistry`].
pub struct FullSync {
    registry: Arc<ModuleRegistry>,
    clock: Arc<dyn Clock>,
    config: FullSyncConfig,
}

impl FullSync {
    /// Creates a driver.
    pub fn new(registry: Arc<ModuleRegistry>, clock: Arc<dyn Clock>, config: FullSyncConfig) -> Self {
        Self {
            registry,
            clock,
            config,
        }
    }

    /// The driver's configuration.
    pub fn config(&self) -> &FullSyncConfig {
        &self.config
    }

    /// Starts a run, estimating every selected module.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::UnknownModule`] if the configuration
    /// names a module that is not registered, or the first estimate
    /// failure.
    pub fn start(&self) -> SyncResult<FullSyncRun> {
        let names = match &self.config.modules {
            Some(names) => names.clone(),
            None => self.registry.names(),
        };

        let mut modules = Vec::with_capacity(names.len());
        for name in names {
            let module = self.registry.require(&name)?;
            let estimated = module.estimate_full_sync_actions(&self.config.scope_for(&name))?;
            modules.push(ModuleProgress {
                module: name,
                estimated,
                enqueued: 0,
                state: FullSyncState::Pending,
            });
        }

        let run = FullSyncRun {
            started_at: self.clock.now(),
            finished_at: None,
            modules,
        };
        info!(
            modules = run.modules.len(),
            estimated = run.total_estimated(),
            "full sync started"
        );
        Ok(run)
    }

    /// Enqueues at most the configured item budget, continuing where the
    /// previous step stopped.
    ///
    /// Returns the number of items enqueued by this step.
    ///
    /// # Errors
    ///
    /// Stops at the first failing module; progress made so far is kept
    /// in `run`.
    pub fn enqueue_step(&self, run: &mut FullSyncRun) -> SyncResult<usize> {
        let mut budget = self.config.max_enqueue_items;
        let mut enqueued = 0;

        for progress in run.modules.iter_mut().filter(|p| !p.is_finished()) {
            if budget == 0 {
                break;
            }
            let module = self.registry.require(&progress.module)?;
            let scope = self.config.scope_for(&progress.module);
            let (count, next) = module.enqueue_full_sync_actions(&scope, budget, progress.state)?;

            progress.enqueued += count;
            progress.state = next;
            enqueued += count;
            budget = budget.saturating_sub(count);
            debug!(module = %progress.module, enqueued = count, done = next.is_done(), "enqueue step");

            if !next.is_done() {
                break;
            }
        }

        run.mark_finished(self.clock.now());
        if run.is_finished() {
            info!(enqueued = run.total_enqueued(), "full sync enqueued");
        }
        Ok(enqueued)
    }

    /// Runs enqueue steps until every module is done.
    ///
    /// Returns the number of items enqueued.
    ///
    /// # Errors
    ///
    /// Propagates the first module failure.
    pub fn enqueue_all(&self, run: &mut FullSyncRun) -> SyncResult<usize> {
        let mut total = 0;
        while !run.is_finished() {
            let before = run.modules.clone();
            total += self.enqueue_step(run)?;
            if run.modules == before {
                warn!("full sync made no progress, stopping");
                break;
            }
        }
        Ok(total)
    }

    /// Sends modules immediately through `sender` until `deadline`.
    ///
    /// A module is only started while the clock is before `deadline`.
    /// Returns true once the run has finished.
    ///
    /// # Errors
    ///
    /// Stops at the first failing module or sender error.
    pub fn send_step(
        &self,
        run: &mut FullSyncRun,
        deadline: Duration,
        sender: &dyn Sender,
    ) -> SyncResult<bool> {
        for progress in run.modules.iter_mut().filter(|p| !p.is_finished()) {
            if self.clock.now() >= deadline {
                debug!(module = %progress.module, "send deadline reached");
                break;
            }
            let module = self.registry.require(&progress.module)?;
            let scope = self.config.scope_for(&progress.module);
            let status = module.send_full_sync_actions(&scope, deadline, progress.state, sender)?;

            if status.finished {
                progress.state = FullSyncState::Done;
            } else {
                progress.state = status.state;
                break;
            }
        }

        run.mark_finished(self.clock.now());
        Ok(run.is_finished())
    }
}

impl std::fmt::Debug for FullSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FullSync")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
