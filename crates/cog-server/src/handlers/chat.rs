//! `POST /chat` and `POST /chat/image` — both return the event stream as SSE.

use crate::state::{AppState, ExecutionIndex};
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use base64::Engine;
use cog_core::runner::{ChatInput, ImageChatInput};
use cog_core::state::{DialogueTurn, ImageAction};
use cog_core::StreamEvent;
use futures::Stream;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
    #[serde(default)]
    pub history: Option<Vec<DialogueTurn>>,
}

#[derive(Debug, Deserialize)]
pub struct ChatImageRequest {
    pub session_id: String,
    pub image: String,
    pub action: ImageAction,
}

pub async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> impl IntoResponse {
    let session_id = req.session_id.clone();
    let stream = state.runner.run(ChatInput { session_id: req.session_id, message: req.message, history: req.history });
    sse_response(stream, session_id, state.execution_index).into_response()
}

pub async fn chat_image(State(state): State<AppState>, Json(req): Json<ChatImageRequest>) -> impl IntoResponse {
    let image = match base64::engine::general_purpose::STANDARD.decode(&req.image) {
        Ok(bytes) => bytes,
        Err(e) => {
            let stream = futures::stream::once(async move {
                    Ok::<_, std::convert::Infallible>(
                        Event::default().event("error").data(format!("{{\"message\":\"invalid base64 image: {e}\"}}")),
                    )
            });
            return Sse::new(Box::pin(stream) as _).keep_alive(KeepAlive::default()).into_response();
        }
    };
    let session_id = req.session_id.clone();
    let stream = state.runner.run_image(ImageChatInput { session_id: req.session_id, image, action: req.action });
    sse_response(stream, session_id, state.execution_index).into_response()
}

/// Converts the runner's `StreamEvent` stream into SSE, recording every `execution_state`
/// event's execution id against this session in the execution index as it passes through
/// (ordering is preserved as-is — this only observes, never reorders or buffers).
fn sse_response(
    mut events: std::pin::Pin<Box<dyn Stream<Item = StreamEvent> + Send>>,
    session_id: String,
    index: Arc<ExecutionIndex>,
) -> Sse<impl Stream<Item = Result<Event, std::convert::Infallible>>> {
    let out = async_stream::stream! {
        use futures::StreamExt;
        while let Some(event) = events.next().await {
            if let StreamEvent::ExecutionState { execution_id, .. } = &event {
                index.record(execution_id, &session_id);
            }
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
