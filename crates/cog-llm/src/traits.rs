//! Core traits for LLM integration.
//!
//! `cog-llm` provides traits only; a real deployment implements them against whatever
//! provider SDK it needs (Claude, OpenAI, a local runner). This keeps the Reasoning node
//! provider-agnostic and mirrors how the core consumes memory and checkpoint backends
//! through narrow interfaces rather than owning their transport.
//!
//! [`ChatModel::chat`] is the non-streaming fallback path. Implementations that
//! support token streaming should also implement [`StreamingChatModel`], which the
//! Reasoning node prefers whenever available.

use crate::error::Result;
use crate::types::{ChatRequest, ChatResponse, StreamChunk};
use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;

/// A finite, non-restartable sequence of tokens. Consumed synchronously by the runner:
/// once exhausted it cannot be polled again (invariant on `response_stream`).
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate a complete response. Used when the model has no streaming support or
    /// the caller explicitly requested `stream = false`.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;
}

#[async_trait]
pub trait StreamingChatModel: ChatModel {
    /// Generate a response as a lazy token stream. The Reasoning node forwards each
    /// chunk as a `text` event and accumulates the full text to parse the trailing
    /// JSON control block once the stream ends.
    async fn stream(&self, request: ChatRequest) -> Result<ChatStream>;
}
