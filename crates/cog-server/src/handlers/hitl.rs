//! `POST /hitl/respond` and `POST /hitl/continue`.
//!
//! The two endpoints map onto one conceptual resume: `/hitl/respond` only records the
//! user's answer and confirms storage; `/hitl/continue` is what actually drives
//! `GraphRunner::resume` and streams the resumed run's events. This split lets a client
//! separate "I answered" acknowledgment from "now show me what happens next", which a
//! single combined endpoint couldn't distinguish.

use crate::error::{ApiError, ApiResult};
use crate::response;
use crate::state::{AppState, StoredHitlResponse};
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use cog_core::nodes::hitl::HitlResponseAction;
use cog_core::StreamEvent;
use futures::Stream;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct HitlRespondRequest {
    pub request_id: String,
    pub session_id: String,
    pub action: HitlResponseAction,
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct HitlRespondAck {
    pub stored: bool,
    pub session_id: String,
}

/// Confirms storage only — does not advance the graph.
pub async fn respond(State(state): State<AppState>, Json(req): Json<HitlRespondRequest>) -> ApiResult<impl IntoResponse> {
    if req.session_id.trim().is_empty() {
        return Err(ApiError::BadRequest("session_id must not be empty".to_string()));
    }
    state.pending_responses.store(
        &req.session_id,
        StoredHitlResponse { request_id: req.request_id, action: req.action, data: req.data },
    );
    Ok(response::ok(HitlRespondAck { stored: true, session_id: req.session_id }))
}

#[derive(Debug, Deserialize)]
pub struct HitlContinueRequest {
    pub session_id: String,
    #[serde(default)]
    pub continuation_data: Option<serde_json::Value>,
}

/// Resumes the suspended run and streams its events (`resume`). Merges any
/// `continuation_data` from this call on top of whatever `/hitl/respond` stored for the
/// session, preferring the more specific per-request data when both are present.
pub async fn cont(State(state): State<AppState>, Json(req): Json<HitlContinueRequest>) -> impl IntoResponse {
    let stored = state.pending_responses.take(&req.session_id);
    let (action, data) = match (stored, req.continuation_data) {
        (Some(s), continuation) => (s.action, continuation.or(s.data)),
        (None, Some(continuation)) => (HitlResponseAction::Approve, Some(continuation)),
        (None, None) => (HitlResponseAction::Approve, None),
    };

    let stream = state.runner.resume(req.session_id, action, data);
    sse_response(stream)
}

fn sse_response(
    mut events: std::pin::Pin<Box<dyn Stream<Item = StreamEvent> + Send>>,
) -> Sse<impl Stream<Item = Result<Event, std::convert::Infallible>>> {
    let out = async_stream::stream! {
        use futures::StreamExt;
        while let Some(event) = events.next().await {
            let type_name = event_type_name(&event);
            let payload = serde_json::to_value(&event).unwrap_or(serde_json::Value::Null);
            let data = payload.get("payload").cloned().unwrap_or(serde_json::json!({}));
            yield Ok(Event::default().event(type_name).data(data.to_string()));
        }
    };
    Sse::new(out).keep_alive(KeepAlive::default())
}

fn event_type_name(event: &StreamEvent) -> &'static str {
    match event {
        StreamEvent::Text {.. } => "text",
        StreamEvent::Emotion {.. } => "emotion",
        StreamEvent::Hitl(_) => "hitl",
        StreamEvent::ToolResult {.. } => "tool_result",
        StreamEvent::ExecutionState {.. } => "execution_state",
        StreamEvent::Done => "done",
        StreamEvent::Error {.. } => "error",
    }
}
