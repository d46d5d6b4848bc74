//! Reset command implementation.

use super::Session;
use crate::error::CliResult;
use tracing::info;

/// Runs the reset command.
pub fn run(session: &Session) -> CliResult<()> {
    session.registry.reset_all()?;
    info!(modules = ?session.registry.names(), "module state reset");
    println!("✓ Sync state reset");
    Ok(())
}
