//! A deterministic stub `ChatModel`, used by the test suite and as a safe default when
//! no provider is configured. It never makes network calls.

use crate::error::Result;
use crate::traits::{ChatModel, ChatStream, StreamingChatModel};
use crate::types::{ChatRequest, ChatResponse, FinishReason, StreamChunk};
use async_trait::async_trait;
use futures::stream;

/// Echoes a fixed reply, optionally split into tokens for streaming tests. Tests that
/// need control-block parsing (`tool_call`, `hitl_request`) construct the stub with a
/// JSON-bearing reply and assert on the Reasoning node's parse of it.
#[derive(Debug, Clone)]
pub struct StubChatModel {
    reply: String,
}

impl StubChatModel {
    pub fn new(reply: impl Into<String>) -> Self {
        Self { reply: reply.into() }
    }
}

#[async_trait]
impl ChatModel for StubChatModel {
    async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse> {
        Ok(ChatResponse { content: self.reply.clone(), finish_reason: FinishReason::Stop })
    }
}

#[async_trait]
impl StreamingChatModel for StubChatModel {
    async fn stream(&self, _request: ChatRequest) -> Result<ChatStream> {
        let tokens: Vec<Result<StreamChunk>> = self
            .reply
            .chars()
            .map(|c| Ok(StreamChunk::token(c.to_string())))
            .chain(std::iter::once(Ok(StreamChunk::end())))
            .collect();
        Ok(Box::pin(stream::iter(tokens)))
    }
}
