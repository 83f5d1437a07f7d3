//! `GET /api/execution/...` : read-only projections over a session's
//! contracts, built by loading the session's checkpoint and running it through
//! [`cog_core::observer::ExecutionObserver`]. A session only has a checkpoint while
//! `suspended` (: the checkpoint is deleted on normal completion) — these endpoints
//! 404 once the run has finished, which matches "404 when none exists".

use crate::error::{ApiError, ApiResult};
use crate::response::{self};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use chrono::Utc;
use cog_core::observer::ExecutionObserver;
use cog_core::state::GraphState;

async fn load_state(state: &AppState, session_id: &str) -> ApiResult<GraphState> {
    let checkpoint = state
        .checkpoint_saver
        .load(session_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound(format!("no execution state for session {session_id}")))?;
    serde_json::from_value(checkpoint.state_json).map_err(|e| ApiError::Internal(format!("checkpoint deserialization failed: {e}")))
}

pub async fn timeline(State(state): State<AppState>, Path(session_id): Path<String>) -> ApiResult<impl IntoResponse> {
    let graph_state = load_state(&state, &session_id).await?;
    let contracts: Vec<_> = graph_state.active_executions.iter().chain(graph_state.completed_executions.iter()).cloned().collect();
    let timeline = ExecutionObserver::timeline(session_id, &contracts, Utc::now());
    Ok(response::ok(timeline))
}

pub async fn snapshot(State(state): State<AppState>, Path(execution_id): Path<String>) -> ApiResult<impl IntoResponse> {
    let session_id = state
        .execution_index
        .session_for(&execution_id)
        .ok_or_else(|| ApiError::NotFound(format!("unknown execution {execution_id}")))?;
    let graph_state = load_state(&state, &session_id).await?;
    let contract = graph_state
        .active_executions
        .iter()
        .chain(graph_state.completed_executions.iter())
        .find(|c| c.execution_id == execution_id)
        .ok_or_else(|| ApiError::NotFound(format!("unknown execution {execution_id}")))?;
    Ok(response::ok(ExecutionObserver::snapshot(contract, Utc::now())))
}

/// Static and cacheable — every call rebuilds the same value.
pub async fn topology() -> impl IntoResponse {
    response::ok(ExecutionObserver::topology())
}
