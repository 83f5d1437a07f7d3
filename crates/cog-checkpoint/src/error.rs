//! Error types for checkpoint operations

use thiserror::Error;

/// Result type for checkpoint operations
pub type Result<T> = std::result::Result<T, CheckpointError>;

/// Errors that can occur while saving, loading, or deleting a session checkpoint.
#[derive(Error, Debug)]
pub enum CheckpointError {
    /// No checkpoint exists for the requested session. Surfaced to `/hitl/continue`
    /// callers as `CheckpointNotFound` (HTTP 404 at the edge).
    #[error("no checkpoint found for session {0}")]
    NotFound(String),

    /// The backing store rejected or failed the write. The runner treats this as
    /// `CheckpointSaveFailed`: it emits an `error` event and leaves the contract in
    /// `WAITING` so the user may retry resume after the store recovers.
    #[error("checkpoint save failed for session {session_id}: {reason}")]
    SaveFailed { session_id: String, reason: String },

    /// `GraphState` could not round-trip through JSON.
    #[error("checkpoint serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic storage-backend failure not covered by the above.
    #[error("checkpoint storage error: {0}")]
    Storage(String),
}
