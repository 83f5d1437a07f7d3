//! The `Checkpoint` value type.
//!
//! A checkpoint is a snapshot of one session's `GraphState`, serialized to JSON, taken
//! immediately before the graph suspends for a human-in-the-loop pause. At most one
//! checkpoint exists per session at any time: a later `save` replaces the earlier one
//! wholesale rather than appending a history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted snapshot of a session's graph state.
///
/// `state_json` is the serialized `GraphState` minus `response_stream`, which is not
/// `Serialize` and is dropped before persisting. `dialogue_history` inside `state_json`
/// may have been truncated to the configured maximum length before serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub session_id: String,
    pub state_json: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Build a checkpoint from a freshly serialized state. `created_at` and `updated_at`
    /// both start at `now`; `updated_at` is bumped by the store on each subsequent save.
    pub fn new(session_id: impl Into<String>, state_json: serde_json::Value, now: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.into(),
            state_json,
            created_at: now,
            updated_at: now,
        }
    }
}
