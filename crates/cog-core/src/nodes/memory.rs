//! Node: Memory. Retrieves relevant long-term memories into
//! `working_memory.retrieved_memories` and records per-memory access statistics.

use super::Node;
use crate::collaborators::memory::MemoryManager;
use crate::error::Result;
use crate::events::StreamEvent;
use crate::state::{GraphState, StateUpdate, WorkingMemory};
use async_trait::async_trait;
use std::sync::Arc;

pub struct MemoryNode {
    manager: Arc<dyn MemoryManager>,
    top_k: usize,
}

impl MemoryNode {
    pub fn new(manager: Arc<dyn MemoryManager>, top_k: usize) -> Self {
        Self { manager, top_k }
    }
}

#[async_trait]
impl Node for MemoryNode {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn compute(&self, state: &GraphState) -> Result<(StateUpdate, Vec<StreamEvent>)> {
        let retrieved = self.manager.retrieve(&state.session_id, &state.semantic_input.text, self.top_k).await;
        for memory in &retrieved {
            self.manager.record_access(&memory.id).await;
        }

        let working_memory = WorkingMemory { retrieved_memories: retrieved, summary: state.working_memory.summary.clone() };

        Ok((StateUpdate { working_memory: Some(working_memory), ..Default::default() }, Vec::new()))
    }
}
