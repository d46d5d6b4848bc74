//! Error type for CLI commands.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;

/// Errors a command can fail with.
#[derive(Debug, Error)]
pub enum CliError {
    /// The settings file could not be read.
    #[error("cannot read settings {path:?}: {source}")]
    SettingsIo {
        /// Settings file path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The settings file is not valid JSON for [`crate::settings::Settings`].
    #[error("invalid settings {path:?}: {source}")]
    SettingsFormat {
        /// Settings file path.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// The state store failed.
    #[error(transparent)]
    Storage(#[from] cdcsync_storage::StorageError),

    /// The sync engine failed.
    #[error(transparent)]
    Sync(#[from] cdcsync_engine::SyncError),

    /// Output could not be serialized.
    #[error("cannot render output: {0}")]
    Output(#[from] serde_json::Error),
}
