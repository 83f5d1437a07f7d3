//! # cog-core - the cognitive dialogue graph
//!
//! The state machine, node set, and orchestrator backing a desktop AI assistant's
//! per-turn reasoning loop. A session's [`state::GraphState`] flows through six nodes
//! (intent, emotion, memory, reasoning, tool, HITL/ECS) plus an optional image entry
//! pair (image, memory extraction), with every side-effectful step tracked as an
//! [`contract::ExecutionContract`] and projected for prompt assembly through
//! [`observer::ExecutionObserver`].
//!
//! ## Layout
//!
//! - [`contract`] - the execution contract state machine (statuses, triggers, transition log)
//! - [`observer`] - read-only projections of contracts for prompt assembly and API responses
//! - [`events`] - the `StreamEvent` wire protocol emitted to callers
//! - [`state`] - `GraphState`, the partial-update `StateUpdate`, and the types nodes share
//! - [`collaborators`] - narrow async-trait interfaces to memory, tool, and OCR backends
//! - [`nodes`] - the six nodes plus the image entry pair, all implementing [`nodes::Node`]
//! - [`orchestrator`] - the node registry and conditional-routing table
//! - [`runner`] - the superstep loop: drives nodes, persists checkpoints, streams events
//! - [`error`] - the runner-fatal error taxonomy
//!
//! Node-local, recoverable failures (a malformed tool call, an LLM returning broken
//! control-block JSON) never reach [`error::GraphError`] — they are folded into
//! `GraphState` fields or degrade to plain text, consistent with the propagation policy
//! in `error`'s module doc.

pub mod collaborators;
pub mod contract;
pub mod error;
pub mod events;
pub mod nodes;
pub mod observer;
pub mod orchestrator;
pub mod runner;
pub mod state;

pub use contract::{ActionDetail, ActorCategory, ContractStatus, ContractType, ExecutionContract, IllegalTransition, Trigger};
pub use error::{GraphError, Result};
pub use events::StreamEvent;
pub use orchestrator::{EntryPoint, GraphOrchestrator, Step};
pub use runner::{ChatInput, EventStream, GraphRunner, ImageChatInput};
pub use state::{GraphState, ResumeRoute, RunStatus, StateUpdate};
