//! Narrow async-trait interfaces for the external collaborators rules out of
//! scope (persistence backends, MCP transport, OCR providers). Each trait is reduced to
//! the minimum shape the node that uses it needs — mirroring how `cog_llm::ChatModel`
//! isolates concrete LLM providers behind one `chat`/`stream` pair rather than the whole
//! provider SDK surface.

pub mod memory;
pub mod ocr;
pub mod tools;

pub use memory::{InMemoryMemoryManager, MemoryManager};
pub use ocr::{ImageOcrProvider, StubOcrProvider};
pub use tools::{InMemoryMcpToolClient, McpToolClient, ToolInvokeError, ToolMetadata};
