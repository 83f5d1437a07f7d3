//! # cog-llm — narrow LLM client interface
//!
//! The cognitive graph's Reasoning node calls an LLM through [`ChatModel`]/
//! [`StreamingChatModel`] rather than against a concrete provider SDK. Real HTTP
//! transports (Claude, OpenAI, a local runner) are external collaborators and
//! live outside this crate; [`StubChatModel`] is the only implementation shipped
//! here, for tests and as a safe default.

pub mod error;
pub mod stub;
pub mod traits;
pub mod types;

pub use error::{LlmError, Result};
pub use stub::StubChatModel;
pub use traits::{ChatModel, ChatStream, StreamingChatModel};
pub use types::{ChatMessage, ChatRequest, ChatResponse, ChatRole, FinishReason, StreamChunk};
