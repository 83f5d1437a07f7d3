//! `McpToolClient`: the narrow interface the Tool node invokes external tools through.
//! The actual MCP transport is modeled as a trait here and left to a real implementation.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("tool invocation failed: {0}")]
pub struct ToolInvokeError(pub String);

/// Per-tool policy looked up before a call: whether the tool is safe to dedupe via
/// `idempotency_key` and whether its effects are irreversible.
#[derive(Debug, Clone, Copy)]
pub struct ToolMetadata {
    pub idempotent: bool,
    pub irreversible: bool,
}

#[async_trait]
pub trait McpToolClient: Send + Sync {
    /// Looks up static policy for `service.method`. `None` means the tool is unknown;
    /// callers treat that as non-idempotent, reversible (the conservative default).
    fn metadata(&self, service: &str, method: &str) -> Option<ToolMetadata>;

    async fn invoke(&self, service: &str, method: &str, arguments: serde_json::Value) -> Result<serde_json::Value, ToolInvokeError>;
}

/// Deterministic stub backing the scenario tests: `math.add` sums its arguments,
/// `email.send` is marked irreversible, everything else echoes its arguments back.
pub struct InMemoryMcpToolClient {
    metadata: HashMap<(String, String), ToolMetadata>,
}

impl Default for InMemoryMcpToolClient {
    fn default() -> Self {
        let mut metadata = HashMap::new();
        metadata.insert(
            ("math".to_string(), "add".to_string()),
            ToolMetadata { idempotent: true, irreversible: false },
        );
        metadata.insert(
            ("email".to_string(), "send".to_string()),
            ToolMetadata { idempotent: false, irreversible: true },
        );
        Self { metadata }
    }
}

impl InMemoryMcpToolClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tool(mut self, service: &str, method: &str, metadata: ToolMetadata) -> Self {
        self.metadata.insert((service.to_string(), method.to_string()), metadata);
        self
    }
}

#[async_trait]
impl McpToolClient for InMemoryMcpToolClient {
    fn metadata(&self, service: &str, method: &str) -> Option<ToolMetadata> {
        self.metadata.get(&(service.to_string(), method.to_string())).copied()
    }

    async fn invoke(&self, service: &str, method: &str, arguments: serde_json::Value) -> Result<serde_json::Value, ToolInvokeError> {
        match (service, method) {
            ("math", "add") => {
                let a = arguments.get("a").and_then(|v| v.as_f64()).ok_or_else(|| ToolInvokeError("missing a".to_string()))?;
                let b = arguments.get("b").and_then(|v| v.as_f64()).ok_or_else(|| ToolInvokeError("missing b".to_string()))?;
                Ok(serde_json::json!(a + b))
            }
            ("email", "send") => Ok(serde_json::json!({ "sent": true })),
            _ => Ok(arguments),
        }
    }
}
