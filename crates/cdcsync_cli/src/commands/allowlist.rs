//! Allowlist command implementation.

use super::{print_entities, Session};
use crate::error::CliResult;
use crate::Format;

/// Runs the allowlist command.
pub fn run(session: &Session, format: Format) -> CliResult<()> {
    let constants = session.constants.all_constants();
    if format == Format::Text {
        println!("Monitoring {} constants", constants.len());
    }
    print_entities(&constants, format)
}
