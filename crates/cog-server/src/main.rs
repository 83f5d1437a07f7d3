//! `cog-server` — the axum HTTP/SSE edge in front of `cog-core`'s `GraphRunner`. This
//! binary wires the in-memory collaborators together and exposes the chat, HITL, and
//! execution-observability routes for local development and the test suite.

mod error;
mod handlers;
mod response;
mod routes;
mod state;

use cog_checkpoint::InMemoryCheckpointSaver;
use cog_core::collaborators::memory::InMemoryMemoryManager;
use cog_core::collaborators::ocr::StubOcrProvider;
use cog_core::collaborators::tools::InMemoryMcpToolClient;
use cog_core::nodes::emotion::EmotionNode;
use cog_core::nodes::hitl::HitlNode;
use cog_core::nodes::image::{ImageNode, MemoryExtractionNode};
use cog_core::nodes::intent::{IntentNode, IntentRule};
use cog_core::nodes::memory::MemoryNode;
use cog_core::nodes::reasoning::ReasoningNode;
use cog_core::nodes::tool::ToolNode;
use cog_core::orchestrator::GraphOrchestrator;
use cog_core::runner::GraphRunner;
use cog_llm::StubChatModel;
use cog_tooling::config::ConfigBuilder;
use cog_tooling::settings::Settings;
use state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;

/// The default Intent Layer 1 rule set. A real deployment loads this from
/// configuration; here it's fixed so the server is runnable out of the box.
fn default_intent_rules() -> Vec<IntentRule> {
    vec![IntentRule::new(
            "mcp_math_add",
            r"(?i)\badd\s+\d+(\.\d+)?\s*(and|\+)\s*\d+(\.\d+)?\b",
            "tool",
            "mcp_tool",
        )
            .with_mcp_service("math")]
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    cog_tooling::logging::init_tracing(std::env::var("COG_LOG_JSON").map(|v| v == "true").unwrap_or(false));

    let settings = Settings::from_env("COG_").unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default settings");
            Settings::default()
    });
    settings.validate()?;

    let memory_manager = Arc::new(InMemoryMemoryManager::new());
    let tool_client = Arc::new(InMemoryMcpToolClient::new());
    let chat_model = Arc::new(StubChatModel::new(""));
    let checkpoint_saver = Arc::new(InMemoryCheckpointSaver::new());

    let orchestrator = Arc::new(GraphOrchestrator::new(
            Arc::new(IntentNode::new(settings.intent_recognition_enabled, settings.intent_layer2_enabled, default_intent_rules(), None)),
            Arc::new(EmotionNode::new()),
            Arc::new(MemoryNode::new(memory_manager.clone(), 5)),
            Arc::new(ReasoningNode::new(chat_model, tool_client.clone(), memory_manager, settings.base_system_prompt.clone(), 20)),
            Arc::new(ToolNode::new(tool_client)),
            Arc::new(HitlNode::new(settings.hitl_chain_cap)),
            Arc::new(ImageNode::new(Arc::new(StubOcrProvider::empty()))),
            Arc::new(MemoryExtractionNode::new()),
    ));

    let runner = Arc::new(GraphRunner::new(orchestrator, checkpoint_saver.clone(), settings));
    let app_state = AppState::new(runner, checkpoint_saver);
    let app = routes::create_router(app_state);

    let port: u16 = std::env::var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "cog-server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
