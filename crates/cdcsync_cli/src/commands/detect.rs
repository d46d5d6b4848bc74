//! Detect command implementation.

use super::{print_entities, print_json, Session};
use crate::error::CliResult;
use crate::Format;
use cdcsync_codec::Value;
use cdcsync_engine::{ChangeEvent, DetectOutcome};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

/// Detection result.
#[derive(Debug, Serialize)]
pub struct DetectResult {
    /// `skipped`, `empty` or `detected`.
    pub outcome: &'static str,
    /// Constants compared.
    pub checked: usize,
    /// Changed constants, in allowlist order.
    pub changes: Vec<(String, Value)>,
}

/// Runs the detect command.
pub fn run(session: &Session, format: Format) -> CliResult<()> {
    let changes = Arc::new(Mutex::new(Vec::new()));
    let sink = changes.clone();
    session
        .registry
        .init_listeners(Arc::new(move |event: &ChangeEvent| {
            sink.lock().push((event.name.clone(), event.value.clone()));
            Ok(())
        }));

    let outcome = session.constants.maybe_detect_changes()?;
    let changes = std::mem::take(&mut *changes.lock());
    let (label, checked) = match outcome {
        DetectOutcome::Skipped => ("skipped", 0),
        DetectOutcome::Empty => ("empty", 0),
        DetectOutcome::Detected { checked, .. } => ("detected", checked),
    };

    match format {
        Format::Json => print_json(&DetectResult {
            outcome: label,
            checked,
            changes,
        }),
        Format::Text => {
            match outcome {
                DetectOutcome::Skipped => {
                    println!(
                        "Detection skipped: ran within the last {}s",
                        session.constants.wait_time().as_secs()
                    );
                }
                DetectOutcome::Empty => println!("Allowlist is empty"),
                DetectOutcome::Detected { emitted, checked } => {
                    println!("Checked {checked} constants, {emitted} changed");
                }
            }
            print_entities(&changes, format)
        }
    }
}
