//! `GraphRunner` : owns the execution loop, translates node updates into the
//! event stream, and drives checkpoint persistence across suspend/resume.

use crate::contract::ContractStatus;
use crate::error::GraphError;
use crate::events::StreamEvent;
use crate::nodes::hitl::{apply_hitl_response, HitlResponseAction};
use crate::orchestrator::{GraphOrchestrator, Step};
use crate::state::{DialogueRole, DialogueTurn, GraphState, ImageAction, ResumeRoute, RunStatus};
use chrono::Utc;
use cog_checkpoint::CheckpointSaver;
use cog_tooling::settings::Settings;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Body of `POST /chat`.
#[derive(Debug, Clone)]
pub struct ChatInput {
    pub session_id: String,
    pub message: String,
    pub history: Option<Vec<DialogueTurn>>,
}

/// Body of `POST /chat/image`.
#[derive(Debug, Clone)]
pub struct ImageChatInput {
    pub session_id: String,
    pub image: Vec<u8>,
    pub action: ImageAction,
}

pub struct GraphRunner {
    orchestrator: Arc<GraphOrchestrator>,
    checkpoint_saver: Arc<dyn CheckpointSaver>,
    settings: Settings,
}

impl GraphRunner {
    pub fn new(orchestrator: Arc<GraphOrchestrator>, checkpoint_saver: Arc<dyn CheckpointSaver>, settings: Settings) -> Self {
        Self { orchestrator, checkpoint_saver, settings }
    }

    /// `run(request)` for the text entry point: builds the initial `GraphState` and
    /// starts the superstep loop from the Intent node.
    pub fn run(&self, input: ChatInput) -> EventStream {
        let mut state = GraphState::new(input.session_id);
        if let Some(history) = input.history {
            state.dialogue_history = history;
        }
        state.semantic_input.text = input.message;
        state.dialogue_history.push(DialogueTurn::new(DialogueRole::User, state.semantic_input.text.clone(), Utc::now()));

        self.drive(state, Step::Intent)
    }

    /// `run` for the image entry point: `Image → MemoryExtraction → HITL → END`.
    pub fn run_image(&self, input: ImageChatInput) -> EventStream {
        let mut state = GraphState::new(input.session_id);
        state.semantic_input.images.push(input.image);
        state.semantic_input.image_action = Some(input.action);

        self.drive(state, Step::Image)
    }

    /// `resume(session_id, hitl_response)`. Runs the full contract: load,
    /// alignment check, inject response, transition, clear suspension, then resume
    /// iteration from wherever the suspended HITL should loop back to.
    pub fn resume(&self, session_id: String, action: HitlResponseAction, data: Option<serde_json::Value>) -> EventStream {
        let orchestrator = self.orchestrator.clone();
        let checkpoint_saver = self.checkpoint_saver.clone();
        let settings = self.settings.clone();

        Box::pin(async_stream::stream! {
                let loaded = match checkpoint_saver.load(&session_id).await {
                    Ok(Some(cp)) => cp,
                    Ok(None) => {
                        yield StreamEvent::Error { message: GraphError::CheckpointNotFound(session_id.clone()).to_string() };
                        return;
                    }
                    Err(e) => {
                        yield StreamEvent::Error { message: format!("checkpoint load failed: {e}") };
                        return;
                    }
                };

                let mut state: GraphState = match serde_json::from_value(loaded.state_json) {
                    Ok(s) => s,
                    Err(e) => {
                        yield StreamEvent::Error { message: format!("checkpoint deserialization failed: {e}") };
                        return;
                    }
                };

                // Alignment check: exactly one WAITING contract expected; a count other
                // than one is logged but doesn't block resume by itself — only zero
                // WAITING contracts is a hard failure.
                let waiting = state.active_executions.iter().filter(|c| c.status == ContractStatus::Waiting).count();
                if waiting == 0 {
                    yield StreamEvent::Error {
                        message: GraphError::AlignmentFailure {
                            session_id: session_id.clone(),
                            reason: "no WAITING contract found for resume".to_string(),
                        }
                            .to_string(),
                    };
                    return;
                }
                if waiting > 1 {
                    warn!(session_id = %session_id, waiting, "alignment check found more than one WAITING contract");
                }

                let resume_route = state.resume_route;
                if let Err(e) = apply_hitl_response(&mut state, action, data) {
                    yield StreamEvent::Error { message: e.to_string() };
                    return;
                }

                let next_step = match resume_route {
                    ResumeRoute::Reasoning => Step::Reasoning,
                    ResumeRoute::Done => Step::End,
                };

                let mut inner = Self::drive_from(orchestrator, checkpoint_saver, settings, state, next_step);
                use futures::StreamExt;
                while let Some(event) = inner.next().await {
                    yield event;
                }
        })
    }

    fn drive(&self, state: GraphState, start: Step) -> EventStream {
        Self::drive_from(self.orchestrator.clone(), self.checkpoint_saver.clone(), self.settings.clone(), state, start)
    }

    /// The shared superstep loop used by both a fresh `run` and a resumed continuation —
    /// the only difference between the two is where iteration starts and whether a
    /// checkpoint needs loading first.
    fn drive_from(
        orchestrator: Arc<GraphOrchestrator>,
        checkpoint_saver: Arc<dyn CheckpointSaver>,
        settings: Settings,
        mut state: GraphState,
        start: Step,
    ) -> EventStream {
        Box::pin(async_stream::stream! {
                let mut step = start;
                loop {
                    if step == Step::End {
                        state.status = RunStatus::Completed;
                        if let Err(e) = checkpoint_saver.delete(&state.session_id).await {
                            yield StreamEvent::Error { message: format!("checkpoint delete failed: {e}") };
                        }
                        yield StreamEvent::Done;
                        break;
                    }

                    let node = match orchestrator.node_for(step) {
                        Some(n) => n,
                        None => break,
                    };
                    debug!(session_id = %state.session_id, node = node.name(), "running node");

                    match node.compute(&state).await {
                        Ok((update, events)) => {
                            for event in events {
                                yield event;
                            }
                            update.merge_into(&mut state, settings.context_variables_byte_budget);
                            if let Some(max) = settings.dialogue_history_max_len {
                                if state.dialogue_history.len() > max {
                                    let excess = state.dialogue_history.len() - max;
                                    state.dialogue_history.drain(0..excess);
                                }
                            }

                            if state.status == RunStatus::Suspended {
                                state.resume_route =
                                if step == Step::MemoryExtraction { ResumeRoute::Done } else { ResumeRoute::Reasoning };
                                let state_json = match serde_json::to_value(&state) {
                                    Ok(v) => v,
                                    Err(e) => {
                                        yield StreamEvent::Error { message: format!("checkpoint serialization failed: {e}") };
                                        break;
                                    }
                                };
                                if let Err(e) = checkpoint_saver.save(&state.session_id, state_json).await {
                                    yield StreamEvent::Error { message: format!("checkpoint save failed: {e}") };
                                }
                                info!(session_id = %state.session_id, "run suspended, checkpoint persisted");
                                break;
                            }

                            if state.status == RunStatus::Failed {
                                break;
                            }

                            step = orchestrator.next_step(step, &state);
                        }
                        Err(err) => {
                            yield StreamEvent::Error { message: err.to_string() };
                            break;
                        }
                    }
                }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::memory::InMemoryMemoryManager;
    use crate::collaborators::ocr::StubOcrProvider;
    use crate::collaborators::tools::InMemoryMcpToolClient;
    use crate::nodes::emotion::EmotionNode;
    use crate::nodes::hitl::HitlNode;
    use crate::nodes::image::{ImageNode, MemoryExtractionNode};
    use crate::nodes::intent::IntentNode;
    use crate::nodes::memory::MemoryNode;
    use crate::nodes::reasoning::{ReasoningNode, CONTROL_SENTINEL};
    use crate::nodes::tool::ToolNode;
    use cog_checkpoint::InMemoryCheckpointSaver;
    use cog_llm::StubChatModel;
    use futures::StreamExt;

    fn runner_with_reply(reply: &str) -> GraphRunner {
        let memory_manager = Arc::new(InMemoryMemoryManager::new());
        let tool_client = Arc::new(InMemoryMcpToolClient::new());
        let orchestrator = Arc::new(GraphOrchestrator::new(
                Arc::new(IntentNode::new(false, false, Vec::new(), None)),
                Arc::new(EmotionNode::new()),
                Arc::new(MemoryNode::new(memory_manager.clone(), 5)),
                Arc::new(ReasoningNode::new(Arc::new(StubChatModel::new(reply)), tool_client.clone(), memory_manager, "You are helpful.", 20)),
                Arc::new(ToolNode::new(tool_client)),
                Arc::new(HitlNode::new(5)),
                Arc::new(ImageNode::new(Arc::new(StubOcrProvider::empty()))),
                Arc::new(MemoryExtractionNode::new()),
        ));
        GraphRunner::new(orchestrator, Arc::new(InMemoryCheckpointSaver::new()), Settings::default())
    }

    #[tokio::test]
    async fn simple_reply_emits_text_and_done_with_no_contracts() {
        let runner = runner_with_reply("hi");
        let mut stream = runner.run(ChatInput { session_id: "s1".to_string(), message: "hello".to_string(), history: None });
        let mut events = Vec::new();
        while let Some(event) = stream.next().await {
            events.push(event);
        }
        assert!(events.iter().any(|e| matches!(e, StreamEvent::Emotion {.. })));
        assert!(events.iter().any(|e| matches!(e, StreamEvent::Text {.. })));
        assert!(matches!(events.last(), Some(StreamEvent::Done)));
    }

    #[tokio::test]
    async fn tool_call_loops_back_to_reasoning_then_completes() {
        let reply = format!(
            "Sure.{}{{\"tool_call\": {{\"tool\": \"math.add\", \"arguments\": {{\"a\": 2, \"b\": 3}}}}}}",
            CONTROL_SENTINEL
        );
        let runner = runner_with_reply(&reply);
        let mut stream = runner.run(ChatInput { session_id: "s1".to_string(), message: "add 2 and 3".to_string(), history: None });
        let mut events = Vec::new();
        while let Some(event) = stream.next().await {
            events.push(event);
        }
        assert!(events.iter().any(|e| matches!(e, StreamEvent::ToolResult {.. })));
        assert!(matches!(events.last(), Some(StreamEvent::Done)));
    }

    #[tokio::test]
    async fn hitl_suspend_persists_checkpoint_and_resume_completes() {
        let reply = format!(
            "{}{{\"hitl_request\": {{\"type\": \"form\", \"title\": \"Confirm send email\", \"fields\": [], \"actions\": {{\"approve\": \"Send\"}}}}}}",
            CONTROL_SENTINEL
        );
        let runner = runner_with_reply(&reply);
        let mut stream = runner.run(ChatInput { session_id: "s1".to_string(), message: "send email to bob".to_string(), history: None });
        let mut events = Vec::new();
        while let Some(event) = stream.next().await {
            events.push(event);
        }
        assert!(events.iter().any(|e| matches!(e, StreamEvent::Hitl(_))));
        assert!(!events.iter().any(|e| matches!(e, StreamEvent::Done)));

        let mut resumed = runner.resume("s1".to_string(), HitlResponseAction::Approve, Some(serde_json::json!({})));
        let mut resumed_events = Vec::new();
        while let Some(event) = resumed.next().await {
            resumed_events.push(event);
        }
        assert!(matches!(resumed_events.last(), Some(StreamEvent::Done)));
    }

    #[tokio::test]
    async fn resume_without_checkpoint_emits_error() {
        let runner = runner_with_reply("hi");
        let mut stream = runner.resume("missing".to_string(), HitlResponseAction::Approve, None);
        let event = stream.next().await.unwrap();
        assert!(matches!(event, StreamEvent::Error {.. }));
    }
}
