//! # cog-checkpoint — session checkpoint persistence
//!
//! Serializes and deserializes one session's `GraphState` at the moment execution
//! suspends for a human-in-the-loop pause. At most one checkpoint exists per session;
//! a later save replaces the earlier one. See [`CheckpointSaver`](traits::CheckpointSaver)
//! for the storage contract and [`InMemoryCheckpointSaver`](memory::InMemoryCheckpointSaver)
//! for the reference backend.
//!
//! Failure semantics: a save failure is [`CheckpointError::SaveFailed`](error::CheckpointError::SaveFailed)
//! and propagates to the runner as a fatal-for-this-call error, leaving the contract in
//! `WAITING` so a later resume (after store recovery) can still succeed. Loading a
//! missing session is not an error at this layer — `load` returns `Ok(None)`; it is the
//! runner's job to turn that into `CheckpointError::NotFound` for `/hitl/continue`.

pub mod checkpoint;
pub mod error;
pub mod memory;
pub mod traits;

pub use checkpoint::Checkpoint;
pub use error::{CheckpointError, Result};
pub use memory::InMemoryCheckpointSaver;
pub use traits::CheckpointSaver;
