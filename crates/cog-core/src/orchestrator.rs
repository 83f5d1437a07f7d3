//! `GraphOrchestrator`. Owns the node instances and the conditional-routing
//! table; compiles a text-entry or image-entry variant. The actual superstep loop lives
//! in [`crate::runner::GraphRunner`] — the orchestrator only answers "what comes next".

use crate::nodes::emotion::EmotionNode;
use crate::nodes::hitl::HitlNode;
use crate::nodes::image::{ImageNode, MemoryExtractionNode};
use crate::nodes::intent::IntentNode;
use crate::nodes::memory::MemoryNode;
use crate::nodes::reasoning::ReasoningNode;
use crate::nodes::tool::ToolNode;
use crate::nodes::Node;
use crate::state::GraphState;
use std::sync::Arc;

/// Which graph variant a run was compiled with ("text-entry and image-entry
/// variant").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    Text,
    Image,
}

/// A node slot in the compiled graph. `End` is a sentinel, not a real `Node`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Intent,
    Emotion,
    Memory,
    Reasoning,
    Tool,
    Hitl,
    Image,
    MemoryExtraction,
    End,
}

pub struct GraphOrchestrator {
    pub intent: Arc<IntentNode>,
    pub emotion: Arc<EmotionNode>,
    pub memory: Arc<MemoryNode>,
    pub reasoning: Arc<ReasoningNode>,
    pub tool: Arc<ToolNode>,
    pub hitl: Arc<HitlNode>,
    pub image: Arc<ImageNode>,
    pub memory_extraction: Arc<MemoryExtractionNode>,
}

impl GraphOrchestrator {
    pub fn new(
        intent: Arc<IntentNode>,
        emotion: Arc<EmotionNode>,
        memory: Arc<MemoryNode>,
        reasoning: Arc<ReasoningNode>,
        tool: Arc<ToolNode>,
        hitl: Arc<HitlNode>,
        image: Arc<ImageNode>,
        memory_extraction: Arc<MemoryExtractionNode>,
    ) -> Self {
        Self { intent, emotion, memory, reasoning, tool, hitl, image, memory_extraction }
    }

    /// First step for a freshly compiled graph.
    pub fn entry_step(&self, entry: EntryPoint) -> Step {
        match entry {
            EntryPoint::Text => Step::Intent,
            EntryPoint::Image => Step::Image,
        }
    }

    /// Looks up the `Node` trait object for a step. `End` has none — callers must check
    /// for it before calling this.
    pub fn node_for(&self, step: Step) -> Option<Arc<dyn Node>> {
        match step {
            Step::Intent => Some(self.intent.clone()),
            Step::Emotion => Some(self.emotion.clone()),
            Step::Memory => Some(self.memory.clone()),
            Step::Reasoning => Some(self.reasoning.clone()),
            Step::Tool => Some(self.tool.clone()),
            Step::Hitl => Some(self.hitl.clone()),
            Step::Image => Some(self.image.clone()),
            Step::MemoryExtraction => Some(self.memory_extraction.clone()),
            Step::End => None,
        }
    }

    /// Unconditional and conditional routing ("Routing conditions out of
    /// Reasoning... From Tool → Reasoning... From HITL on suspend → END").
    ///
    /// This only covers the *forward* iteration within one `run`/`resume` call — the
    /// loop-back into Reasoning after a HITL resume is driven by
    /// `GraphRunner::resume`, not by this function, since resuming starts a fresh
    /// iteration rather than continuing the one that suspended.
    pub fn next_step(&self, current: Step, state: &GraphState) -> Step {
        match current {
            Step::Intent => Step::Emotion,
            Step::Emotion => Step::Memory,
            Step::Memory => Step::Reasoning,
            Step::Reasoning => {
                if state.hitl_request.is_some() {
                    Step::Hitl
                } else if !state.pending_tool_calls.is_empty() {
                    Step::Tool
                } else {
                    Step::End
                }
            }
            Step::Tool => Step::Reasoning,
            Step::Hitl => Step::End,
            Step::Image => Step::MemoryExtraction,
            Step::MemoryExtraction => {
                if state.hitl_request.is_some() {
                    Step::Hitl
                } else {
                    Step::End
                }
            }
            Step::End => Step::End,
        }
    }
}
