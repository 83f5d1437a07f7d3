//! The wire event protocol. `StreamEvent` is the runner's output type;
//! `cog-server` serializes each variant to an SSE frame with `type`/`payload` fields.

use crate::state::HitlRequest;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum StreamEvent {
    Text { content: String },
    Emotion { primary: String, category: String, confidence: f32 },
    Hitl(HitlRequest),
    ToolResult { tool: String, result: Option<serde_json::Value>, error: Option<String> },
    ExecutionState {
        execution_id: String,
        action_summary: String,
        from_status: String,
        to_status: String,
        trigger: String,
        actor_category: String,
        is_terminal: bool,
        is_resumable: bool,
        has_side_effects: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    Done,
    Error { message: String },
}
