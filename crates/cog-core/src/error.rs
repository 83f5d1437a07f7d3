//! Error taxonomy for the cognitive graph core.
//!
//! Grouped **by kind, not by type name**: `MalformedLLMOutput` and `ToolExecutionFailed`
//! are node-local and recoverable (folded into `observation`/`error_message`, never
//! returned to the runner as `Err`); the remaining variants are runner-fatal and surface
//! as a single `error` event.

use crate::contract::IllegalTransition;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

/// Runner-fatal errors. Node-local recoverable conditions (`ToolExecutionFailed`,
/// `MalformedLLMOutput`) are represented as plain values on `GraphState`
/// (`observation`, assistant text) rather than as `GraphError` variants —
/// they must never abort a run, so giving them an `Err` path here would invite
/// exceptions-as-control-flow.
#[derive(Error, Debug)]
pub enum GraphError {
    /// A contract's state machine rejected a transition. The contract is left unchanged;
    /// callers that catch this (e.g. an idempotency re-check racing a concurrent resume)
    /// may continue the run, but an uncaught occurrence is runner-fatal.
    #[error("illegal transition: {0}")]
    IllegalTransition(#[from] IllegalTransition),

    /// The configured `ChatModel`/`StreamingChatModel` failed. Reasoning sets
    /// `status = failed` and the run ends with a final `error` event.
    #[error("LLM transport error: {0}")]
    LlmTransport(#[from] cog_llm::LlmError),

    /// Exceeded the per-run HITL nesting cap. Dropping the request is
    /// the node-local recovery; this variant exists for the cases where the cap is
    /// enforced at the runner boundary instead (e.g. a resumed run already at the cap).
    #[error("HITL chain depth cap ({cap}) exceeded for session {session_id}")]
    HitlChainOverflow { session_id: String, cap: usize },

    /// Checkpoint save failed during suspension. The runner emits `error` and leaves the
    /// contract in `WAITING` — a later resume after the store recovers can still succeed.
    #[error("checkpoint save failed: {0}")]
    CheckpointSaveFailed(#[source] cog_checkpoint::CheckpointError),

    /// No checkpoint exists for a `/hitl/continue` request (HTTP 404 at the edge).
    #[error("no checkpoint for session {0}")]
    CheckpointNotFound(String),

    /// Pre-resume verification found zero `WAITING` contracts.
    #[error("alignment check failed for session {session_id}: {reason}")]
    AlignmentFailure { session_id: String, reason: String },

    /// A collaborator (`MemoryManager`, `McpToolClient`, `ImageOcrProvider`) returned an
    /// error the node could not fold into `observation`.
    #[error("collaborator error: {0}")]
    Collaborator(String),

    /// The run was cancelled mid-execution; every non-terminal contract has already been
    /// transitioned to `CANCELLED` by the time this is raised.
    #[error("run cancelled for session {0}")]
    CancelledByUser(String),
}
