//! `GraphState`: the single shared state object that flows through every node.
//!
//! A node never mutates `GraphState` in place — it returns a [`StateUpdate`] describing
//! the fields it touched, and the runner merges that update into the state it owns. This
//! mirrors how the original reducer-based state schema treated a node's return value as a
//! partial update rather than a full replacement, generalized here to the fixed field set
//! the cognitive graph needs instead of an open channel map.

use crate::contract::ExecutionContract;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Top-level run status carried on `GraphState` (distinct from `ExecutionContract::status`,
/// which tracks one side-effectful step).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Suspended,
    Completed,
    Failed,
}

/// Where a resumed run continues once its one `WAITING` contract is settled. The text
/// entry's HITL loops back into Reasoning; the image entry's HITL has no such loop —
/// approving the extracted memory just persists it and ends the run. Not part of the
/// contract/status data model itself, but the two entry points need to round-trip
/// through a suspend/resume cycle distinctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeRoute {
    Reasoning,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueRole {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueTurn {
    pub role: DialogueRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl DialogueTurn {
    pub fn new(role: DialogueRole, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self { role, content: content.into(), timestamp }
    }
}

/// What action, if any, an entering image is tagged with on `POST /chat/image`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageAction {
    AnalyzeOnly,
    AnalyzeForMemory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentSource {
    Layer1,
    Layer2,
    Fallback,
}

/// The Intent node's classification result. `None` on `GraphState` means intent
/// recognition was disabled or has not run yet for this turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentResult {
    pub category: String,
    pub intent_type: String,
    pub confidence: f32,
    pub source: IntentSource,
    pub matched_rule: Option<String>,
    pub mcp_service: Option<String>,
}

impl IntentResult {
    pub fn fallback() -> Self {
        Self {
            category: "normal".to_string(),
            intent_type: "normal".to_string(),
            confidence: 0.0,
            source: IntentSource::Fallback,
            matched_rule: None,
            mcp_service: None,
        }
    }

    /// Layer 1/2 write a non-`"normal"` category; prompt assembly checks this to decide
    /// between the short intent snippet and the full HITL/MCP instruction.
    pub fn is_normal(&self) -> bool {
        self.category == "normal"
    }
}

/// User input for the current turn plus whatever the Intent node derived from it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SemanticInput {
    pub text: String,
    #[serde(default)]
    pub images: Vec<Vec<u8>>,
    pub image_action: Option<ImageAction>,
    /// Short prompt snippet written by the Intent node (distinct from `intent_result`,
    /// which carries the full classification — "writes `semantic_input.intent`").
    pub intent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryReference {
    pub id: String,
    pub category: String,
    pub summary: String,
    pub score: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkingMemory {
    pub retrieved_memories: Vec<MemoryReference>,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionalContext {
    pub current_emotion: String,
    pub confidence: f32,
    pub modulation_instruction: String,
}

impl Default for EmotionalContext {
    fn default() -> Self {
        Self { current_emotion: "neutral".to_string(), confidence: 0.0, modulation_instruction: String::new() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub tool: String,
    pub arguments: serde_json::Value,
    /// Carried alongside the call so Tool can set `ExecutionContract::irreversible`
    /// without a second round-trip to the MCP registry.
    pub irreversible: bool,
    pub idempotent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitlRequestKind {
    Form,
    VisualDisplay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HitlField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub label: String,
    #[serde(default)]
    pub required: bool,
    pub options: Option<Vec<String>>,
    pub default: Option<serde_json::Value>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
    pub placeholder: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HitlActions {
    pub approve: Option<String>,
    pub edit: Option<String>,
    pub reject: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub alignment: Option<Vec<String>>,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayAscii {
    pub content: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Display {
    Table { data: DisplayTable },
    Ascii { data: DisplayAscii },
}

/// An HITL/ECS request. `form` and `visual_display` share the envelope
/// but diverge on payload — modeled as an explicit tagged union's "dynamic typing
/// → explicit tagged variants" design note rather than one struct with unused fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HitlRequest {
    Form {
        id: String,
        title: String,
        description: Option<String>,
        fields: Vec<HitlField>,
        actions: Option<HitlActions>,
        session_id: String,
        ttl_seconds: Option<u64>,
        readonly: Option<bool>,
    },
    VisualDisplay {
        id: String,
        title: String,
        description: Option<String>,
        displays: Vec<Display>,
        dismiss_label: Option<String>,
        session_id: String,
        readonly: Option<bool>,
    },
}

impl HitlRequest {
    pub fn kind(&self) -> HitlRequestKind {
        match self {
            HitlRequest::Form {.. } => HitlRequestKind::Form,
            HitlRequest::VisualDisplay {.. } => HitlRequestKind::VisualDisplay,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            HitlRequest::Form { title, .. } => title,
            HitlRequest::VisualDisplay { title, .. } => title,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            HitlRequest::Form { id, .. } => id,
            HitlRequest::VisualDisplay { id, .. } => id,
        }
    }
}

/// A structured memory write the LLM asked for via the `memory_update` control-block
/// field. Forwarded to `MemoryManager::persist_update`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryUpdate {
    pub category: String,
    pub key: String,
    pub value: serde_json::Value,
}

/// Size-bounded key/value bag with LRU eviction when exceeding a configured byte
/// budget. Tracks insertion order so the least-recently-touched entry is evicted first;
/// `set` on an existing key moves it to the back without changing the eviction of others.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextVariables {
    order: Vec<String>,
    values: HashMap<String, serde_json::Value>,
}

impl ContextVariables {
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Insert/replace a value and evict the oldest entries until the serialized size of
    /// all values is within `byte_budget`. Eviction is best-effort on serialization
    /// failure (an unserializable value simply isn't counted toward the budget).
    pub fn set(&mut self, key: impl Into<String>, value: serde_json::Value, byte_budget: usize) {
        let key = key.into();
        if let Some(pos) = self.order.iter().position(|k| k == &key) {
            self.order.remove(pos);
        }
        self.order.push(key.clone());
        self.values.insert(key, value);
        self.evict_to_budget(byte_budget);
    }

    fn total_bytes(&self) -> usize {
        self.values
            .values()
            .map(|v| serde_json::to_vec(v).map(|b| b.len()).unwrap_or(0))
            .sum()
    }

    fn evict_to_budget(&mut self, byte_budget: usize) {
        while self.total_bytes() > byte_budget && !self.order.is_empty() {
            let oldest = self.order.remove(0);
            self.values.remove(&oldest);
        }
    }
}

/// The shared state object. `response_stream` is intentionally absent here —
/// it is a runner-local, non-restartable token stream (invariant), never part of the
/// value nodes hand back as a `StateUpdate`; the runner consumes it synchronously inside
/// `GraphRunner::run` and only the accumulated text ever reaches `dialogue_history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphState {
    pub session_id: String,
    pub semantic_input: SemanticInput,
    pub dialogue_history: Vec<DialogueTurn>,
    pub working_memory: WorkingMemory,
    pub emotional_context: EmotionalContext,
    pub intent_result: Option<IntentResult>,
    pub pending_tool_calls: Vec<ToolCallRequest>,
    pub observation: Option<String>,
    pub hitl_request: Option<HitlRequest>,
    pub status: RunStatus,
    pub active_executions: Vec<ExecutionContract>,
    pub completed_executions: Vec<ExecutionContract>,
    pub context_variables: ContextVariables,
    /// Incremented by the HITL node each time a new request is issued; checked against
    /// `Settings::hitl_chain_cap`.
    pub hitl_chain_depth: usize,
    /// Execution ids already surfaced to Reasoning as a consequence-view block, so a
    /// completed contract is reported exactly once across however many loop-backs the
    /// run takes. Round-trips through checkpointing like every other field.
    pub surfaced_executions: Vec<String>,
    pub resume_route: ResumeRoute,
}

impl GraphState {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            semantic_input: SemanticInput::default(),
            dialogue_history: Vec::new(),
            working_memory: WorkingMemory::default(),
            emotional_context: EmotionalContext::default(),
            intent_result: None,
            pending_tool_calls: Vec::new(),
            observation: None,
            hitl_request: None,
            status: RunStatus::Running,
            active_executions: Vec::new(),
            completed_executions: Vec::new(),
            context_variables: ContextVariables::default(),
            hitl_chain_depth: 0,
            surfaced_executions: Vec::new(),
            resume_route: ResumeRoute::Reasoning,
        }
    }

    /// Total contracts ever created in this run — `active_executions.len() +
    /// completed_executions.len()` must equal this at every point (invariant).
    pub fn total_contracts(&self) -> usize {
        self.active_executions.len() + self.completed_executions.len()
    }

    pub fn find_active_mut(&mut self, execution_id: &str) -> Option<&mut ExecutionContract> {
        self.active_executions.iter_mut().find(|c| c.execution_id == execution_id)
    }

    /// Moves a contract out of `active_executions` into `completed_executions` once it
    /// reaches a terminal status. No-op if the contract isn't found active.
    pub fn complete_active(&mut self, execution_id: &str) {
        if let Some(pos) = self.active_executions.iter().position(|c| c.execution_id == execution_id) {
            let contract = self.active_executions.remove(pos);
            self.completed_executions.push(contract);
        }
    }

    /// Looks up a previously COMPLETED contract by idempotency key.
    pub fn find_completed_by_idempotency_key(&self, key: &str) -> Option<&ExecutionContract> {
        self.completed_executions.iter().find(|c| c.idempotency_key.as_deref() == Some(key))
    }
}

/// A node's partial update to `GraphState` — the only way nodes communicate change. All
/// fields are optional; `merge_into` only overwrites what the node actually set, matching
/// the "a single immutable-after-write `GraphState`... merged into the state" contract.
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    pub semantic_input: Option<SemanticInput>,
    pub intent_result: Option<IntentResult>,
    pub emotional_context: Option<EmotionalContext>,
    pub working_memory: Option<WorkingMemory>,
    pub pending_tool_calls: Option<Vec<ToolCallRequest>>,
    pub observation: Option<Option<String>>,
    pub hitl_request: Option<Option<HitlRequest>>,
    pub status: Option<RunStatus>,
    pub dialogue_append: Vec<DialogueTurn>,
    pub new_active_execution: Option<ExecutionContract>,
    pub context_variable: Option<(String, serde_json::Value)>,
    pub hitl_chain_depth_increment: bool,
    pub newly_surfaced_executions: Vec<String>,
}

impl StateUpdate {
    pub fn merge_into(self, state: &mut GraphState, context_byte_budget: usize) {
        if let Some(v) = self.semantic_input {
            state.semantic_input = v;
        }
        if let Some(v) = self.intent_result {
            state.intent_result = Some(v);
        }
        if let Some(v) = self.emotional_context {
            state.emotional_context = v;
        }
        if let Some(v) = self.working_memory {
            state.working_memory = v;
        }
        if let Some(v) = self.pending_tool_calls {
            state.pending_tool_calls = v;
        }
        if let Some(v) = self.observation {
            state.observation = v;
        }
        if let Some(v) = self.hitl_request {
            state.hitl_request = v;
        }
        if let Some(v) = self.status {
            state.status = v;
        }
        state.dialogue_history.extend(self.dialogue_append);
        if let Some(contract) = self.new_active_execution {
            if contract.status.is_terminal() {
                state.completed_executions.push(contract);
            } else {
                state.active_executions.push(contract);
            }
        }
        if let Some((key, value)) = self.context_variable {
            state.context_variables.set(key, value, context_byte_budget);
        }
        if self.hitl_chain_depth_increment {
            state.hitl_chain_depth += 1;
        }
        state.surfaced_executions.extend(self.newly_surfaced_executions);
    }
}
