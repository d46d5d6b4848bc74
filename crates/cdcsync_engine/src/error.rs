//! Error types for the sync engine.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during change detection or full sync.
///
/// Lock contention is deliberately absent: a debounced detection is a
/// normal outcome, not an error.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The key-value store failed.
    #[error("storage error: {0}")]
    Storage(#[from] cdcsync_storage::StorageError),

    /// A persisted value could not be decoded.
    #[error("codec error: {0}")]
    Codec(#[from] cdcsync_codec::CodecError),

    /// A registered listener failed.
    #[error("listener for {event} failed: {message}")]
    Listener {
        /// Event the listener was registered for.
        event: String,
        /// Error message.
        message: String,
    },

    /// The sender could not deliver an action.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// No module is registered under this name.
    #[error("unknown sync module: {0}")]
    UnknownModule(String),

    /// A module with this name is already registered.
    #[error("sync module already registered: {0}")]
    DuplicateModule(String),
}

impl SyncError {
    /// Creates a listener error.
    pub fn listener(event: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Listener {
            event: event.into(),
            message: message.into(),
        }
    }

    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if the caller may retry the failed operation.
    ///
    /// Nothing in this crate retries; the flag is for the transport.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::Storage(cdcsync_storage::StorageError::Unavailable(_)) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(SyncError::transport_retryable("connection lost").is_retryable());
        assert!(!SyncError::transport_fatal("rejected").is_retryable());
        assert!(SyncError::Storage(cdcsync_storage::StorageError::Unavailable(
            "down".into()
        ))
        .is_retryable());
        assert!(!SyncError::UnknownModule("posts".into()).is_retryable());
    }

    #[test]
    fn error_display() {
        let err = SyncError::listener("sync_constant", "queue full");
        assert_eq!(
            err.to_string(),
            "listener for sync_constant failed: queue full"
        );

        let err = SyncError::UnknownModule("posts".into());
        assert!(err.to_string().contains("posts"));
    }
}
