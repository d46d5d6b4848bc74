//! CLI command implementations.

pub mod allowlist;
pub mod detect;
pub mod estimate;
pub mod full_sync;
pub mod inspect;
pub mod reset;

use crate::error::CliResult;
use crate::settings::Settings;
use crate::Format;
use cdcsync_codec::Value;
use cdcsync_engine::{ConstantsModule, EnvSource, ModuleRegistry, SyncContext};
use cdcsync_storage::{FileStore, KeyValueStore, SystemClock};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Everything a command needs: the store, the modules and the registry.
pub struct Session {
    /// Collaborators shared by the modules.
    pub ctx: SyncContext,
    /// The constants module.
    pub constants: Arc<ConstantsModule>,
    /// Every module, constants included.
    pub registry: Arc<ModuleRegistry>,
}

impl Session {
    /// Opens the store at `store_path` and builds the modules.
    pub fn open(store_path: &Path, settings: &Settings) -> CliResult<Self> {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(store_path)?);
        let ctx = SyncContext::new(store, Arc::new(SystemClock));
        let source = EnvSource::new()
            .with_prefix(settings.env_prefix.clone())
            .typed(settings.typed);
        let constants = Arc::new(ConstantsModule::new(
            settings.constants_config(),
            &ctx,
            Arc::new(source),
        ));

        let mut registry = ModuleRegistry::new();
        registry.register(constants.clone())?;
        debug!(store = ?store_path, modules = ?registry.names(), "session opened");

        Ok(Self {
            ctx,
            constants,
            registry: Arc::new(registry),
        })
    }
}

/// One emitted name/value pair, as printed.
#[derive(Debug, Serialize)]
pub struct EntityLine<'a> {
    /// Entity name.
    pub name: &'a str,
    /// Entity value.
    pub value: &'a Value,
}

/// Prints a serializable result as JSON.
pub fn print_json<T: Serialize>(result: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}

/// Prints entity lines in the chosen format.
pub fn print_entities(entities: &[(String, Value)], format: Format) -> CliResult<()> {
    match format {
        Format::Json => {
            let lines: Vec<EntityLine<'_>> = entities
                .iter()
                .map(|(name, value)| EntityLine { name, value })
                .collect();
            print_json(&lines)
        }
        Format::Text => {
            for (name, value) in entities {
                println!("  {name} = {value}");
            }
            Ok(())
        }
    }
}
