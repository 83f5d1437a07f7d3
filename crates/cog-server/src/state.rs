//! Shared application state for the HTTP/SSE edge.

use cog_checkpoint::CheckpointSaver;
use cog_core::GraphRunner;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Maps an execution id to the session it belongs to, so `GET
/// /api/execution/{execution_id}/snapshot` can find the right checkpoint without a
/// dedicated index table. Populated as `execution_state` events pass through the SSE
/// handlers — the same "derive an index from the stream you're already forwarding"
/// approach as a broadcast-state registry, just keyed for point lookups instead of fan-out.
#[derive(Default)]
pub struct ExecutionIndex {
    session_by_execution: RwLock<HashMap<String, String>>,
}

impl ExecutionIndex {
    pub fn record(&self, execution_id: &str, session_id: &str) {
        self.session_by_execution.write().unwrap().insert(execution_id.to_string(), session_id.to_string());
    }

    pub fn session_for(&self, execution_id: &str) -> Option<String> {
        self.session_by_execution.read().unwrap().get(execution_id).cloned()
    }
}

/// A stored `/hitl/respond` call, held until the matching `/hitl/continue` picks it up
/// (: `/hitl/respond` only confirms storage; the actual resumed run streams
/// from `/hitl/continue`). Keyed by `session_id` since at most one HITL request is ever
/// `WAITING` per session (invariant).
#[derive(Debug, Clone)]
pub struct StoredHitlResponse {
    pub request_id: String,
    pub action: cog_core::nodes::hitl::HitlResponseAction,
    pub data: Option<serde_json::Value>,
}

#[derive(Default)]
pub struct PendingResponses {
    by_session: RwLock<HashMap<String, StoredHitlResponse>>,
}

impl PendingResponses {
    pub fn store(&self, session_id: &str, response: StoredHitlResponse) {
        self.by_session.write().unwrap().insert(session_id.to_string(), response);
    }

    pub fn take(&self, session_id: &str) -> Option<StoredHitlResponse> {
        self.by_session.write().unwrap().remove(session_id)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<GraphRunner>,
    pub checkpoint_saver: Arc<dyn CheckpointSaver>,
    pub execution_index: Arc<ExecutionIndex>,
    pub pending_responses: Arc<PendingResponses>,
}

impl AppState {
    pub fn new(runner: Arc<GraphRunner>, checkpoint_saver: Arc<dyn CheckpointSaver>) -> Self {
        Self {
            runner,
            checkpoint_saver,
            execution_index: Arc::new(ExecutionIndex::default()),
            pending_responses: Arc::new(PendingResponses::default()),
        }
    }
}
