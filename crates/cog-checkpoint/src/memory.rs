//! In-memory checkpoint storage.
//!
//! [`InMemoryCheckpointSaver`] keeps one `Checkpoint` per session in a `RwLock<HashMap>`.
//! It has no persistence across process restarts and is the reference implementation
//! used by the test suite and by `cog-server` when no external store is configured.

use crate::{
    checkpoint::Checkpoint,
    error::Result,
    traits::CheckpointSaver,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Default)]
pub struct InMemoryCheckpointSaver {
    storage: Arc<RwLock<HashMap<String, Checkpoint>>>,
}

impl InMemoryCheckpointSaver {
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of sessions currently holding a checkpoint. Exposed for tests asserting
    /// that a resume or cancellation cleaned up after itself.
    pub async fn session_count(&self) -> usize {
        self.storage.read().await.len()
    }
}

#[async_trait]
impl CheckpointSaver for InMemoryCheckpointSaver {
    async fn save(&self, session_id: &str, state_json: serde_json::Value) -> Result<()> {
        let mut storage = self.storage.write().await;
        let now = Utc::now();
        storage
            .entry(session_id.to_string())
            .and_modify(|cp| {
                cp.state_json = state_json.clone();
                cp.updated_at = now;
        })
            .or_insert_with(|| Checkpoint::new(session_id, state_json, now));
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<Checkpoint>> {
        Ok(self.storage.read().await.get(session_id).cloned())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        self.storage.write().await.remove(session_id);
        Ok(())
    }
}
