//! The six nodes (table), sharing one minimal capability's "deep
//! inheritance → composition" design note: `compute(state) -> (StateUpdate, Vec<StreamEvent>)`.
//! Cross-cutting concerns (logging, telemetry) are applied by the runner around each call
//! rather than inherited through a node base type. Reasoning buffers its model stream and
//! returns it as ordinary `StreamEvent::Text` entries like every other node, rather than
//! pushing tokens through a side channel — see `nodes::reasoning` for why.

pub mod emotion;
pub mod hitl;
pub mod image;
pub mod intent;
pub mod memory;
pub mod reasoning;
pub mod tool;

use crate::error::Result;
use crate::events::StreamEvent;
use crate::state::{GraphState, StateUpdate};
use async_trait::async_trait;

/// A node observes the current state and returns the fields it changed plus any events
/// the runner should emit immediately.
#[async_trait]
pub trait Node: Send + Sync {
    fn name(&self) -> &'static str;

    async fn compute(&self, state: &GraphState) -> Result<(StateUpdate, Vec<StreamEvent>)>;
}
