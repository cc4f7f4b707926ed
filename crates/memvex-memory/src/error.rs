// error.rs — Error types for the memory subsystem.

use thiserror::Error;

/// Errors that can occur during memory operations.
///
/// Forgetting an unknown id is not an error; `forget` returns `false`.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Caller input the store refuses to persist (e.g., blank content).
    #[error("invalid input: {0}")]
    InvalidInput(String),

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

    /// Failed to serialize/deserialize tags.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// A persisted row could not be mapped back to a MemoryEntry.
    #[error("corrupt memory row '{id}': {reason}")]
    CorruptRow { id: String, reason: String },

    /// The embedding provider failed.
    #[error("embedding provider '{provider}' failed: {reason}")]
    Embedding { provider: String, reason: String },
}
