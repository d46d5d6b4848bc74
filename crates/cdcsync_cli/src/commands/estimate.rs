//! Estimate command implementation.

use super::{print_json, Session};
use crate::error::CliResult;
use crate::Format;
use cdcsync_engine::{ModuleScope, SyncModule};
use serde::Serialize;

/// Full-sync estimate of one module.
#[derive(Debug, Serialize)]
pub struct EstimateLine {
    /// Module name.
    pub module: String,
    /// Items a full sync would enqueue.
    pub estimated: usize,
    /// Objects the module monitors.
    pub total: usize,
}

/// Runs the estimate command.
pub fn run(session: &Session, format: Format) -> CliResult<()> {
    let mut lines = Vec::with_capacity(session.registry.len());
    for module in session.registry.iter() {
        lines.push(EstimateLine {
            module: module.name().to_string(),
            estimated: module.estimate_full_sync_actions(&ModuleScope::All)?,
            total: module.total()?,
        });
    }

    match format {
        Format::Json => print_json(&lines),
        Format::Text => {
            for line in &lines {
                println!("{}: {} items ({} monitored)", line.module, line.estimated, line.total);
            }
            let sum: usize = lines.iter().map(|l| l.estimated).sum();
            println!("Total: {sum}");
            Ok(())
        }
    }
}
