//! cdcsync CLI
//!
//! Runs the constants sync module against process environment variables
//! and a file-backed state store.
//!
//! # Commands
//!
//! - `detect` - Emit constants that changed since the last detection
//! - `full-sync` - Enqueue or immediately send a full sync
//! - `estimate` - Show full-sync estimates per module
//! - `inspect` - Show stored checksums and lock state
//! - `reset` - Delete all persisted module state
//! - `allowlist` - Show monitored constants and their current values

mod commands;
mod error;
mod settings;

use clap::{Parser, Subcommand, ValueEnum};
use commands::Session;
use settings::Settings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Change-data-capture sync tools.
#[derive(Parser)]
#[command(name = "cdcsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the state store file
    #[arg(global = true, short, long, default_value = "cdcsync-state.cbor")]
    store: PathBuf,

    /// JSON settings file overriding the allowlist and wait time
    #[arg(global = true, long)]
    settings: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Output format
    #[arg(global = true, short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    #[command(subcommand)]
    command: Commands,
}

/// How command results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Human-readable lines
    Text,
    /// One JSON document per result
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Emit constants that changed since the last detection
    Detect,

    /// Run a full sync of every module
    FullSync {
        /// Send directly instead of going through listeners
        #[arg(short, long)]
        immediate: bool,

        /// Items per enqueue step
        #[arg(short, long, default_value = "100")]
        max_items: usize,

        /// Seconds the immediate send may run for
        #[arg(long, default_value = "30")]
        send_for: u64,
    },

    /// Show full-sync estimates per module
    Estimate,

    /// Show stored checksums and lock state
    Inspect,

    /// Delete all persisted module state
    Reset,

    /// Show monitored constants and their current values
    Allowlist,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let settings = match &cli.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let session = Session::open(&cli.store, &settings)?;

    match cli.command {
        Commands::Detect => commands::detect::run(&session, cli.format)?,
        Commands::FullSync {
            immediate,
            max_items,
            send_for,
        } => {
            if immediate {
                commands::full_sync::send(&session, send_for, cli.format)?;
            } else {
                commands::full_sync::enqueue(&session, max_items, cli.format)?;
            }
        }
        Commands::Estimate => commands::estimate::run(&session, cli.format)?,
        Commands::Inspect => commands::inspect::run(&session, cli.format)?,
        Commands::Reset => commands::reset::run(&session)?,
        Commands::Allowlist => commands::allowlist::run(&session, cli.format)?,
    }

    Ok(())
}
