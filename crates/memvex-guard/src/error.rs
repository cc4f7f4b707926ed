// error.rs — Error types for the guard subsystem.

use thiserror::Error;

/// Errors that can occur during guard operations.
///
/// Note that "request not found" and "request already decided" are not
/// errors: the approval backends report them as `None`.
#[derive(Debug, Error)]
pub enum GuardError {
    /// A rule in the configuration is malformed.
    #[error("invalid guard rule '{action}': {reason}")]
    InvalidRule { action: String, reason: String },

    /// A filesystem operation failed (e.g., creating the data directory).
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: String,
        source: std::io::Error,
    },

    /// The embedded SQLite store reported an error.
    #[cfg(feature = "sqlite")]
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Failed to serialize/deserialize request parameters.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The guard is turned off, so no approval request can be created.
    #[error("guard is disabled; approval requests are not accepted")]
    Disabled,

    /// A persisted row could not be mapped back to an ApprovalRequest.
    #[error("corrupt approval row '{id}': {reason}")]
    CorruptRow { id: String, reason: String },
}
