//! Full-sync command implementation.

use super::{print_json, EntityLine, Session};
use crate::error::CliResult;
use crate::Format;
use cdcsync_engine::{
    FullSync, FullSyncConfig, FullSyncEvent, FullSyncPayload, FullSyncRun, Sender, SyncResult,
};
use cdcsync_storage::Clock;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// A sent full-sync action, as printed.
#[derive(Debug, Serialize)]
pub struct ActionLine<'a> {
    /// Action name.
    pub action: &'a str,
    /// Expanded entities, if the payload carried any.
    pub entities: Vec<EntityLine<'a>>,
}

/// Per-module summary of a run.
#[derive(Debug, Serialize)]
pub struct ModuleLine {
    /// Module name.
    pub module: String,
    /// Estimated items.
    pub estimated: usize,
    /// Enqueued items.
    pub enqueued: usize,
    /// Whether the module finished.
    pub finished: bool,
}

fn summary(run: &FullSyncRun) -> Vec<ModuleLine> {
    run.progress()
        .iter()
        .map(|p| ModuleLine {
            module: p.module.clone(),
            estimated: p.estimated,
            enqueued: p.enqueued,
            finished: p.is_finished(),
        })
        .collect()
}

/// Prints actions as they would go over the wire.
struct StdoutSender {
    format: Format,
}

impl Sender for StdoutSender {
    fn send_action(&self, action: &str, payload: &FullSyncPayload) -> SyncResult<()> {
        print_action(action, payload, self.format)
            .map_err(|e| cdcsync_engine::SyncError::transport_fatal(e.to_string()))
    }
}

fn print_action(action: &str, payload: &FullSyncPayload, format: Format) -> CliResult<()> {
    let entities: Vec<EntityLine<'_>> = match payload {
        FullSyncPayload::Entities(entities) => entities
            .iter()
            .map(|(name, value)| EntityLine { name, value })
            .collect(),
        FullSyncPayload::Expand(_) => Vec::new(),
    };
    match format {
        Format::Json => print_json(&ActionLine { action, entities }),
        Format::Text => {
            println!("{action}");
            for line in entities {
                println!("  {} = {}", line.name, line.value);
            }
            Ok(())
        }
    }
}

fn print_summary(run: &FullSyncRun, format: Format) -> CliResult<()> {
    match format {
        Format::Json => print_json(&summary(run)),
        Format::Text => {
            for line in summary(run) {
                println!(
                    "{}: {}/{} {}",
                    line.module,
                    line.enqueued,
                    line.estimated,
                    if line.finished { "done" } else { "pending" }
                );
            }
            Ok(())
        }
    }
}

/// Enqueues a full sync and plays the sender's part: each enqueued
/// action is expanded by its module and printed.
pub fn enqueue(session: &Session, max_items: usize, format: Format) -> CliResult<()> {
    let queue = Arc::new(Mutex::new(Vec::new()));
    let sink = queue.clone();
    session
        .registry
        .init_full_sync_listeners(Arc::new(move |event: &FullSyncEvent| {
            sink.lock().push(event.clone());
            Ok(())
        }));

    let sync = FullSync::new(
        session.registry.clone(),
        session.ctx.clock.clone(),
        FullSyncConfig::new().with_max_enqueue_items(max_items),
    );
    let mut run = sync.start()?;
    let enqueued = sync.enqueue_all(&mut run)?;
    info!(enqueued, "full sync enqueued");

    let queued = std::mem::take(&mut *queue.lock());
    for event in queued {
        let payload = session
            .registry
            .expand_full_sync_payload(&event.action, event.payload)?;
        print_action(&event.action, &payload, format)?;
    }
    print_summary(&run, format)
}

/// Sends a full sync immediately, for at most `send_for` seconds.
pub fn send(session: &Session, send_for: u64, format: Format) -> CliResult<()> {
    let sync = FullSync::new(
        session.registry.clone(),
        session.ctx.clock.clone(),
        FullSyncConfig::new(),
    );
    let deadline = session.ctx.clock.now() + Duration::from_secs(send_for);
    let sender = StdoutSender { format };

    let mut run = sync.start()?;
    while !sync.send_step(&mut run, deadline, &sender)? {
        if session.ctx.clock.now() >= deadline {
            info!("send deadline reached before the full sync finished");
            break;
        }
    }
    print_summary(&run, format)
}
