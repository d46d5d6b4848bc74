//! Inspect command implementation.

use super::{print_json, Session};
use crate::error::CliResult;
use crate::Format;
use cdcsync_codec::Value;
use cdcsync_engine::DebounceLock;
use serde::Serialize;

/// Persisted state of the constants module.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Whether the debounce lock is held.
    pub locked: bool,
    /// Stored checksum per constant.
    pub checksums: Vec<(String, Value)>,
}

/// Runs the inspect command.
pub fn run(session: &Session, format: Format) -> CliResult<()> {
    let lock = DebounceLock::new(session.ctx.store.clone(), session.ctx.clock.clone());
    let record = session.constants.checksums()?;
    let result = InspectResult {
        locked: lock.is_held(cdcsync_engine::CONSTANTS_AWAIT_KEY)?,
        checksums: record
            .iter()
            .map(|(name, sum)| (name.to_string(), sum.clone()))
            .collect(),
    };

    match format {
        Format::Json => print_json(&result),
        Format::Text => {
            println!(
                "Debounce lock: {}",
                if result.locked { "held" } else { "free" }
            );
            println!("Stored checksums: {}", result.checksums.len());
            for (name, sum) in &result.checksums {
                println!("  {name}: {sum}");
            }
            Ok(())
        }
    }
}
