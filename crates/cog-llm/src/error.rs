//! Error types for the narrow LLM client interface.
//!
//! `cog-llm` does not make HTTP calls itself — concrete provider transports are an
//! external collaborator. `LlmError` is therefore transport-agnostic: a real
//! implementation wraps its HTTP client's errors into `Transport`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LlmError>;

/// Errors surfaced by a `ChatModel`/`StreamingChatModel` implementation.
///
/// Any variant here reaching the Reasoning node is converted into an
/// `LLMTransportError`: the node sets `status = failed`, records `error_message`,
/// and the run ends with a final `error` event.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The underlying transport failed (connection refused, DNS failure, non-2xx, etc).
    #[error("LLM transport error: {0}")]
    Transport(String),

    /// The provider rejected the request as malformed.
    #[error("invalid LLM request: {0}")]
    InvalidRequest(String),

    /// The provider's response could not be parsed into a `ChatResponse`.
    #[error("invalid LLM response: {0}")]
    InvalidResponse(String),

    /// The call exceeded its deadline.
    #[error("LLM request timed out after {0}ms")]
    Timeout(u64),

    /// The stream ended or was polled after `StreamChunk::is_final` was already seen.
    #[error("response stream already exhausted")]
    StreamExhausted,
}

impl LlmError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::Transport(_) | LlmError::Timeout(_))
    }
}
