//! Node: Reasoning — the core of the core. Assembles the prompt, calls the
//! streaming LLM, and parses the model's structured control block into `pending_tool_calls`,
//! `hitl_request`, and a forwarded `memory_update`.

use super::Node;
use crate::collaborators::memory::MemoryManager;
use crate::collaborators::tools::McpToolClient;
use crate::error::{GraphError, Result};
use crate::events::StreamEvent;
use crate::observer::ExecutionObserver;
use crate::state::{
    Display, DialogueRole, DialogueTurn, GraphState, HitlActions, HitlField, HitlRequest, MemoryUpdate, RunStatus,
    StateUpdate, ToolCallRequest,
};
use async_trait::async_trait;
use chrono::Utc;
use cog_llm::{ChatMessage, ChatRequest, StreamingChatModel};
use serde::Deserialize;
use std::sync::Arc;

/// Marks the end of user-visible text in the model's raw output, ahead of the JSON
/// control block ("the model may emit a sentinel before the JSON"). A model that
/// omits the sentinel falls back to the trailing-JSON-object heuristic in `split_output`.
pub const CONTROL_SENTINEL: &str = "\n<<<CONTROL>>>\n";

pub struct ReasoningNode {
    model: Arc<dyn StreamingChatModel>,
    tool_client: Arc<dyn McpToolClient>,
    memory_manager: Arc<dyn MemoryManager>,
    base_system_prompt: String,
    hitl_full_instruction: String,
    dialogue_window: usize,
}

impl ReasoningNode {
    pub fn new(
        model: Arc<dyn StreamingChatModel>,
        tool_client: Arc<dyn McpToolClient>,
        memory_manager: Arc<dyn MemoryManager>,
        base_system_prompt: impl Into<String>,
        dialogue_window: usize,
    ) -> Self {
        Self {
            model,
            tool_client,
            memory_manager,
            base_system_prompt: base_system_prompt.into(),
            hitl_full_instruction: "When an action needs user confirmation or presents read-only results, \
            emit a `hitl_request` (form for confirmation/edits, visual_display for read-only tables \
                or ASCII art). When a request matches an available tool, emit a `tool_call`."
                .to_string(),
            dialogue_window,
        }
    }

    fn assemble_prompt(&self, state: &GraphState) -> Vec<ChatMessage> {
        let mut system = String::new();

        // 1. Base system prompt
        system.push_str(&self.base_system_prompt);
        system.push('\n');

        // 2. Working-memory summary
        if !state.working_memory.summary.is_empty() {
            system.push_str("\nWorking memory summary:\n");
            system.push_str(&state.working_memory.summary);
            system.push('\n');
        }

        // 3. Top-k relevant long-term memories
        if !state.working_memory.retrieved_memories.is_empty() {
            system.push_str("\nRelevant memories:\n");
            for memory in &state.working_memory.retrieved_memories {
                system.push_str(&format!("- [{}] {}\n", memory.category, memory.summary));
            }
        }

        // 4. Emotion modulation instruction
        if !state.emotional_context.modulation_instruction.is_empty() {
            system.push_str("\nTone guidance: ");
            system.push_str(&state.emotional_context.modulation_instruction);
            system.push('\n');
        }

        // 5. Intent snippet, or the full HITL/MCP instruction for backward compatibility
        match &state.intent_result {
            Some(intent) if !intent.is_normal() => {
                system.push_str(&format!("\nIntent hint: user request classified as `{}` ({}).\n", intent.intent_type, intent.category));
                if let Some(service) = &intent.mcp_service {
                    system.push_str(&format!("Consider the `{service}` MCP tool for this request.\n"));
                }
            }
            _ => {
                system.push_str("\n");
                system.push_str(&self.hitl_full_instruction);
                system.push('\n');
            }
        }

        // 6. Consequence-view block for contracts not yet surfaced
        let unsurfaced: Vec<_> = state
            .completed_executions
            .iter()
            .filter(|c| !state.surfaced_executions.contains(&c.execution_id))
            .collect();
        if !unsurfaced.is_empty() {
            system.push_str("\nRecent execution results:\n");
            for contract in &unsurfaced {
                let view = ExecutionObserver::consequence_view(contract);
                let warning = if view.has_side_effects { " \u{26a0}\u{fe0f} IRREVERSIBLE" } else { "" };
                let outcome = view
                    .result
                    .as_ref()
                    .map(|r| r.to_string())
                    .or_else(|| view.error_message.clone())
                    .unwrap_or_default();
                system.push_str(&format!("[{:?}{warning}] {}: {outcome}\n", view.consequence_label, view.action_summary));
            }
        }

        let mut messages = vec![ChatMessage::system(system)];

        // Recent dialogue history, excluding the current turn if the runner already
        // appended it ahead of this call (the common case — see `GraphRunner::run`); a
        // tool-loop or HITL-resume reentry instead ends on an assistant turn, so the
        // whole history is in scope and the current message is simply repeated below.
        let history = &state.dialogue_history;
        let current_already_last = matches!(
            history.last(),
            Some(t) if t.role == DialogueRole::User && t.content == state.semantic_input.text
        );
        let window = if current_already_last { &history[..history.len() - 1] } else { &history[..] };
        let start = window.len().saturating_sub(self.dialogue_window);
        for turn in &window[start..] {
            let message = match turn.role {
                DialogueRole::User => ChatMessage::user(turn.content.clone()),
                DialogueRole::Assistant => ChatMessage::assistant(turn.content.clone()),
                DialogueRole::System => ChatMessage::system(turn.content.clone()),
            };
            messages.push(message);
        }

        // 8. Current user message
        messages.push(ChatMessage::user(state.semantic_input.text.clone()));

        messages
    }

    /// Splits raw model output into the user-visible prefix and the trailing JSON
    /// control block, preferring the explicit sentinel and falling back to locating the
    /// last `{` that parses as a standalone JSON value.
    fn split_output(raw: &str) -> (&str, &str) {
        if let Some(idx) = raw.find(CONTROL_SENTINEL) {
            return (&raw[..idx], &raw[idx + CONTROL_SENTINEL.len()..]);
        }
        for (idx, ch) in raw.char_indices() {
            if ch == '{' && serde_json::from_str::<serde_json::Value>(&raw[idx..]).is_ok() {
                return (&raw[..idx], &raw[idx..]);
            }
        }
        (raw, "")
    }

    async fn run_llm(&self, state: &GraphState) -> Result<(String, Vec<StreamEvent>)> {
        let request = ChatRequest::new(self.assemble_prompt(state)).streaming();
        let mut chat_stream = self.model.stream(request).await?;

        let mut raw_output = String::new();
        {
            use futures::StreamExt;
            while let Some(chunk) = chat_stream.next().await {
                let chunk = chunk?;
                if chunk.is_final {
                    break;
                }
                raw_output.push_str(&chunk.content);
            }
        }

        let (visible, control_raw) = Self::split_output(&raw_output);
        let visible = visible.to_string();
        let control_raw = control_raw.to_string();

        let mut events = Vec::new();
        if !visible.is_empty() {
            events.push(StreamEvent::Text { content: visible.clone() });
        }

        Ok((format!("{visible}\x1f{control_raw}"), events))
    }

    async fn build_tool_call(&self, tool: &str, arguments: serde_json::Value) -> ToolCallRequest {
        let (service, method) = tool.split_once('.').unwrap_or((tool, ""));
        let metadata = self.tool_client.metadata(service, method);
        ToolCallRequest {
            tool: tool.to_string(),
            arguments,
            irreversible: metadata.map(|m| m.irreversible).unwrap_or(false),
            idempotent: metadata.map(|m| m.idempotent).unwrap_or(false),
        }
    }

    fn build_hitl_request(raw: RawHitlRequest, session_id: &str) -> HitlRequest {
        let id = uuid::Uuid::new_v4().to_string();
        match raw.kind.as_str() {
            "visual_display" => HitlRequest::VisualDisplay {
                id,
                title: raw.title,
                description: raw.description,
                displays: raw.displays.unwrap_or_default(),
                dismiss_label: raw.dismiss_label,
                session_id: session_id.to_string(),
                readonly: raw.readonly,
            },
            _ => HitlRequest::Form {
                id,
                title: raw.title,
                description: raw.description,
                fields: raw.fields.unwrap_or_default(),
                actions: raw.actions,
                session_id: session_id.to_string(),
                ttl_seconds: raw.ttl_seconds,
                readonly: raw.readonly,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawToolCall {
    tool: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RawHitlRequest {
    #[serde(rename = "type")]
    kind: String,
    title: String,
    description: Option<String>,
    #[serde(default)]
    fields: Option<Vec<HitlField>>,
    actions: Option<HitlActions>,
    #[serde(default)]
    displays: Option<Vec<Display>>,
    dismiss_label: Option<String>,
    ttl_seconds: Option<u64>,
    readonly: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct ControlBlock {
    text: Option<String>,
    tool_call: Option<RawToolCall>,
    hitl_request: Option<RawHitlRequest>,
    memory_update: Option<MemoryUpdate>,
}

#[async_trait]
impl Node for ReasoningNode {
    fn name(&self) -> &'static str {
        "reasoning"
    }

    async fn compute(&self, state: &GraphState) -> Result<(StateUpdate, Vec<StreamEvent>)> {
        let (combined, mut events) = match self.run_llm(state).await {
            Ok(v) => v,
            Err(GraphError::LlmTransport(e)) => {
                return Ok((
                        StateUpdate { status: Some(RunStatus::Failed), ..Default::default() },
                        vec![StreamEvent::Error { message: format!("LLM transport error: {e}") }],
                ));
            }
            Err(other) => return Err(other),
        };
        let mut parts = combined.splitn(2, '\x1f');
        let visible = parts.next().unwrap_or_default().to_string();
        let control_raw = parts.next().unwrap_or_default();

        let mut update = StateUpdate::default();
        let mut assistant_text = visible.clone();

        if !control_raw.trim().is_empty() {
            match serde_json::from_str::<ControlBlock>(control_raw) {
                Ok(block) => {
                    if let Some(text) = block.text {
                        if assistant_text.is_empty() {
                            assistant_text = text.clone();
                            if !text.is_empty() {
                                events.push(StreamEvent::Text { content: text });
                            }
                        }
                    }
                    if let Some(raw_call) = block.tool_call {
                        let call = self.build_tool_call(&raw_call.tool, raw_call.arguments).await;
                        let mut pending = state.pending_tool_calls.clone();
                        pending.push(call);
                        update.pending_tool_calls = Some(pending);
                        update.observation = Some(None);
                    }
                    if let Some(raw_hitl) = block.hitl_request {
                        let request = Self::build_hitl_request(raw_hitl, &state.session_id);
                        update.hitl_request = Some(Some(request));
                    }
                    if let Some(memory_update) = block.memory_update {
                        if let Err(err) = self.memory_manager.persist_update(&state.session_id, memory_update).await {
                            events.push(StreamEvent::Error { message: format!("memory update failed: {err}") });
                        }
                    }
                }
                Err(_) => {
                    // Malformed control block: downgrade to plain text, never fail the run.
                    if assistant_text.is_empty() {
                        assistant_text = format!("{visible}{control_raw}");
                        events.push(StreamEvent::Text { content: control_raw.to_string() });
                    }
                }
            }
        }

        update.dialogue_append = vec![DialogueTurn::new(crate::state::DialogueRole::Assistant, assistant_text, Utc::now())];
        update.newly_surfaced_executions =
        state.completed_executions.iter().map(|c| c.execution_id.clone()).filter(|id| !state.surfaced_executions.contains(id)).collect();

        Ok((update, events))
    }
}
