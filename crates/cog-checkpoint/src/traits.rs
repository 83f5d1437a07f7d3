//! The `CheckpointSaver` trait — the storage abstraction the core depends on.
//!
//! Implementors provide persistence for `Checkpoint` values keyed by `session_id`. The
//! core ships [`InMemoryCheckpointSaver`](crate::memory::InMemoryCheckpointSaver) as a
//! reference implementation; a production deployment swaps in a SQL-backed saver behind
//! a `checkpoint` table (`session_id PRIMARY KEY, state_json, created_at, updated_at`)
//! without the runner needing to change.
//!
//! # Contract
//!
//! - `save` is an upsert: a second call for the same session replaces the first.
//! - `load` of a missing session returns `Ok(None)`, not an error; the runner turns that
//! into `CheckpointError::NotFound` at the `/hitl/continue` edge.
//! - `delete` is called once, after a successful resume; deleting a session with no
//! checkpoint is not an error.

use crate::checkpoint::Checkpoint;
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait CheckpointSaver: Send + Sync {
    /// Upsert the checkpoint for `session_id`, replacing any prior value.
    async fn save(&self, session_id: &str, state_json: serde_json::Value) -> Result<()>;

    /// Load the checkpoint for `session_id`, if one exists.
    async fn load(&self, session_id: &str) -> Result<Option<Checkpoint>>;

    /// Remove the checkpoint for `session_id`. A no-op if none exists.
    async fn delete(&self, session_id: &str) -> Result<()>;
}
