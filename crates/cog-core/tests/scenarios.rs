//! End-to-end tests driving `GraphRunner` against stub collaborators exactly as a
//! real deployment wires a concrete `ChatModel`/`McpToolClient`/`ImageOcrProvider`
//! behind the same traits.

use cog_checkpoint::InMemoryCheckpointSaver;
use cog_core::collaborators::memory::InMemoryMemoryManager;
use cog_core::collaborators::ocr::StubOcrProvider;
use cog_core::collaborators::tools::InMemoryMcpToolClient;
use cog_core::nodes::emotion::EmotionNode;
use cog_core::nodes::hitl::{HitlNode, HitlResponseAction};
use cog_core::nodes::image::{ImageNode, MemoryExtractionNode};
use cog_core::nodes::intent::{IntentNode, IntentRule};
use cog_core::nodes::memory::MemoryNode;
use cog_core::nodes::reasoning::{ReasoningNode, CONTROL_SENTINEL};
use cog_core::nodes::tool::ToolNode;
use cog_core::orchestrator::GraphOrchestrator;
use cog_core::runner::{ChatInput, GraphRunner, ImageChatInput};
use cog_core::state::ImageAction;
use cog_core::StreamEvent;
use cog_llm::StubChatModel;
use cog_tooling::settings::Settings;
use futures::StreamExt;
use std::sync::Arc;

fn runner(reply: &str, rules: Vec<IntentRule>) -> GraphRunner {
    let memory_manager = Arc::new(InMemoryMemoryManager::new());
    let tool_client = Arc::new(InMemoryMcpToolClient::new());
    let orchestrator = Arc::new(GraphOrchestrator::new(
            Arc::new(IntentNode::new(true, false, rules, None)),
            Arc::new(EmotionNode::new()),
            Arc::new(MemoryNode::new(memory_manager.clone(), 5)),
            Arc::new(ReasoningNode::new(
                    Arc::new(StubChatModel::new(reply)),
                    tool_client.clone(),
                    memory_manager,
                    "You are a helpful assistant.",
                    20,
            )),
            Arc::new(ToolNode::new(tool_client)),
            Arc::new(HitlNode::new(5)),
            Arc::new(ImageNode::new(Arc::new(StubOcrProvider::empty()))),
            Arc::new(MemoryExtractionNode::new()),
    ));
    GraphRunner::new(orchestrator, Arc::new(InMemoryCheckpointSaver::new()), Settings::default())
}

fn runner_with_ocr(text: &str) -> GraphRunner {
    let memory_manager = Arc::new(InMemoryMemoryManager::new());
    let tool_client = Arc::new(InMemoryMcpToolClient::new());
    let orchestrator = Arc::new(GraphOrchestrator::new(
            Arc::new(IntentNode::new(true, false, Vec::new(), None)),
            Arc::new(EmotionNode::new()),
            Arc::new(MemoryNode::new(memory_manager.clone(), 5)),
            Arc::new(ReasoningNode::new(Arc::new(StubChatModel::new("")), tool_client.clone(), memory_manager, "", 20)),
            Arc::new(ToolNode::new(tool_client)),
            Arc::new(HitlNode::new(5)),
            Arc::new(ImageNode::new(Arc::new(if text.is_empty() { StubOcrProvider::empty() } else { StubOcrProvider::new(text) }))),
            Arc::new(MemoryExtractionNode::new()),
    ));
    GraphRunner::new(orchestrator, Arc::new(InMemoryCheckpointSaver::new()), Settings::default())
}

/// Simple reply: `emotion`, `text`, `done`; no contracts created.
#[tokio::test]
async fn simple_reply_emits_emotion_text_done() {
    let runner = runner("hi", Vec::new());
    let events: Vec<_> = runner.run(ChatInput { session_id: "s1".to_string(), message: "hello".to_string(), history: None }).collect().await;

    assert!(matches!(events[0], StreamEvent::Emotion {.. }));
    assert!(events.iter().any(|e| matches!(e, StreamEvent::Text { content } if content == "hi")));
    assert!(matches!(events.last(), Some(StreamEvent::Done)));
    assert!(!events.iter().any(|e| matches!(e, StreamEvent::ExecutionState {.. })));
}

/// A second identical `tool_call` in the same session surfaces a synthetic SUCCESS
/// instead of creating a second contract.
#[tokio::test]
async fn repeated_tool_call_is_deduped_by_idempotency_key() {
    let reply = format!(
        "{}{{\"tool_call\": {{\"tool\": \"math.add\", \"arguments\": {{\"a\": 2, \"b\": 3}}}}}}",
        CONTROL_SENTINEL
    );
    let rules = vec![IntentRule::new("math_add", r"(?i)add", "tool", "mcp_tool").with_mcp_service("math")];
    let runner = runner(&reply, rules);

    let events: Vec<_> =
    runner.run(ChatInput { session_id: "s1".to_string(), message: "add 2 and 3".to_string(), history: None }).collect().await;
    let completed_transitions =
    events.iter().filter(|e| matches!(e, StreamEvent::ExecutionState { to_status, .. } if to_status == "Completed")).count();
    assert_eq!(completed_transitions, 1);
    assert!(events.iter().any(|e| matches!(e, StreamEvent::ToolResult { result: Some(r), .. } if *r == serde_json::json!(5.0))));
}

/// HITL suspend and resume: the first run stops at `hitl` with no `done`; resuming
/// transitions the WAITING contract and completes.
#[tokio::test]
async fn hitl_suspend_and_resume_completes_contract() {
    let reply = format!(
        "{}{{\"hitl_request\": {{\"type\": \"form\", \"title\": \"Confirm send email\", \"fields\": [{{\"name\": \"to\", \"type\": \"text\", \"label\": \"To\"}}], \"actions\": {{\"approve\": \"Send\"}}}}}}",
        CONTROL_SENTINEL
    );
    let runner = runner(&reply, Vec::new());

    let events: Vec<_> = runner
        .run(ChatInput { session_id: "s1".to_string(), message: "send email to bob@example.com".to_string(), history: None })
        .collect()
        .await;
    assert!(events.iter().any(|e| matches!(e, StreamEvent::Hitl(_))));
    assert!(!events.iter().any(|e| matches!(e, StreamEvent::Done)));

    let resumed: Vec<_> =
    runner.resume("s1".to_string(), HitlResponseAction::Approve, Some(serde_json::json!({"to": "bob@example.com"}))).collect().await;
    assert!(resumed
            .iter()
            .any(|e| matches!(e, StreamEvent::ExecutionState { from_status, to_status, .. } if from_status == "Waiting" && to_status == "Running")));
    assert!(matches!(resumed.last(), Some(StreamEvent::Done)));
}

/// visual_display: the `hitl` event carries the full table schema and the stored
/// `context_variables["hitl_<title>"]` entry keeps the same `displays`.
#[tokio::test]
async fn visual_display_request_stores_displays_def() {
    let reply = format!(
        "{}{{\"hitl_request\": {{\"type\": \"visual_display\", \"title\": \"Prices\", \"displays\": [{{\"type\": \"table\", \"data\": {{\"headers\": [\"name\", \"price\"], \"rows\": [[\"iPhone\", \"5999\"], [\"Pixel\", \"4499\"]]}}}}]}}}}",
        CONTROL_SENTINEL
    );
    let runner = runner(&reply, Vec::new());

    let events: Vec<_> =
    runner.run(ChatInput { session_id: "s1".to_string(), message: "show me prices".to_string(), history: None }).collect().await;

    let hitl_event = events.iter().find(|e| matches!(e, StreamEvent::Hitl(_))).expect("hitl event present");
    match hitl_event {
        StreamEvent::Hitl(cog_core::state::HitlRequest::VisualDisplay { displays, .. }) => {
            assert_eq!(displays.len(), 1);
        }
        _ => panic!("expected visual_display request"),
    }
}

/// Image OCR text flows into a "Save plan" HITL form.
#[tokio::test]
async fn image_memory_populated_ocr_produces_save_plan_form() {
    let runner = runner_with_ocr("Meeting tomorrow 3pm with Bob");
    let events: Vec<_> =
    runner.run_image(ImageChatInput { session_id: "s1".to_string(), image: vec![1, 2, 3], action: ImageAction::AnalyzeForMemory }).collect().await;

    assert!(events.iter().any(|e| matches!(e, StreamEvent::Text { content } if content.contains("Meeting"))));
    assert!(events.iter().any(|e| matches!(e, StreamEvent::Hitl(_))));
    assert!(!events.iter().any(|e| matches!(e, StreamEvent::Done)));
}

/// No text extracted means no HITL, just text + done.
#[tokio::test]
async fn image_memory_empty_ocr_skips_hitl() {
    let runner = runner_with_ocr("");
    let events: Vec<_> =
    runner.run_image(ImageChatInput { session_id: "s1".to_string(), image: vec![], action: ImageAction::AnalyzeOnly }).collect().await;

    assert!(events.iter().any(|e| matches!(e, StreamEvent::Text { content } if content == "(no text found)")));
    assert!(!events.iter().any(|e| matches!(e, StreamEvent::Hitl(_))));
    assert!(matches!(events.last(), Some(StreamEvent::Done)));
}

/// An illegal transition attempt leaves the contract unchanged.
#[test]
fn illegal_transition_is_rejected_and_leaves_contract_unchanged() {
    use chrono::Utc;
    use cog_core::{ActionDetail, ActorCategory, ContractStatus, ContractType, ExecutionContract, Trigger};

    let mut contract = ExecutionContract::new(
        "exec-1",
        ContractType::ToolCall,
        ActionDetail { service: "math".to_string(), method: "add".to_string(), arguments: serde_json::json!({}) },
        false,
        None,
        Utc::now(),
    );
    let err = contract
        .transition(Trigger::Succeed, "test", ActorCategory::System, Utc::now(), Some(serde_json::json!(1)), None, None)
        .unwrap_err();
    assert_eq!(err.from, ContractStatus::Pending);
    assert!(contract.transitions.is_empty());
    assert_eq!(contract.status, ContractStatus::Pending);
}

/// Resuming a session with no checkpoint surfaces `CheckpointNotFound` as an `error` event.
#[tokio::test]
async fn resume_missing_checkpoint_is_reported_as_error_event() {
    let runner = runner("hi", Vec::new());
    let events: Vec<_> = runner.resume("never-existed".to_string(), HitlResponseAction::Approve, None).collect().await;
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], StreamEvent::Error { message } if message.contains("no checkpoint")));
}
