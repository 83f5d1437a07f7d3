//! `MemoryManager`: the narrow interface the Memory node and Reasoning's `memory_update`
//! handling use against the long-term memory backend ("persistence backends
//!    ... the core consumes them through narrow interfaces").

use crate::state::{MemoryReference, MemoryUpdate};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

#[async_trait]
pub trait MemoryManager: Send + Sync {
    /// Top-k relevant long-term memories for `query`. Empty `Vec` when
    /// nothing matches — never an error; a miss is a normal outcome, not a failure.
    async fn retrieve(&self, session_id: &str, query: &str, k: usize) -> Vec<MemoryReference>;

    /// MUST be called once per memory surfaced to Reasoning's prompt ("update
    /// per-memory access statistics").
    async fn record_access(&self, memory_id: &str);

    /// Persists a `memory_update` emitted by Reasoning's LLM output parsing.
    async fn persist_update(&self, session_id: &str, update: MemoryUpdate) -> Result<(), String>;
}

#[derive(Debug, Clone)]
struct StoredMemory {
    reference: MemoryReference,
    access_count: u32,
}

/// Deterministic in-memory backend, keyed by a naive substring match against `summary`.
/// Sufficient for the scenario tests in `tests/scenarios.rs`; a real deployment wires a
/// vector-search backend behind the same trait.
#[derive(Default)]
pub struct InMemoryMemoryManager {
    memories: RwLock<HashMap<String, StoredMemory>>,
}

impl InMemoryMemoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, reference: MemoryReference) {
        let mut guard = self.memories.write().unwrap();
        guard.insert(reference.id.clone(), StoredMemory { reference, access_count: 0 });
    }

    pub fn access_count(&self, memory_id: &str) -> u32 {
        self.memories.read().unwrap().get(memory_id).map(|m| m.access_count).unwrap_or(0)
    }
}

#[async_trait]
impl MemoryManager for InMemoryMemoryManager {
    async fn retrieve(&self, _session_id: &str, query: &str, k: usize) -> Vec<MemoryReference> {
        let guard = self.memories.read().unwrap();
        let query_lower = query.to_lowercase();
        let mut matches: Vec<MemoryReference> = guard
            .values()
            .filter(|m| query_lower.is_empty() || m.reference.summary.to_lowercase().contains(&query_lower))
            .map(|m| m.reference.clone())
            .collect();
        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(k);
        matches
    }

    async fn record_access(&self, memory_id: &str) {
        if let Some(entry) = self.memories.write().unwrap().get_mut(memory_id) {
            entry.access_count += 1;
        }
    }

    async fn persist_update(&self, _session_id: &str, update: MemoryUpdate) -> Result<(), String> {
        let mut guard = self.memories.write().unwrap();
        guard.insert(
            update.key.clone(),
            StoredMemory {
                reference: MemoryReference {
                    id: update.key,
                    category: update.category,
                    summary: update.value.to_string(),
                    score: 1.0,
                },
                access_count: 0,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn retrieve_matches_on_summary_substring() {
        let mgr = InMemoryMemoryManager::new();
        mgr.seed(MemoryReference { id: "m1".to_string(), category: "fact".to_string(), summary: "likes tea".to_string(), score: 0.9 });
        let results = mgr.retrieve("s1", "tea", 5).await;
        assert_eq!(results.len(), 1);
        mgr.record_access("m1").await;
        assert_eq!(mgr.access_count("m1"), 1);
    }

    #[tokio::test]
    async fn retrieve_empty_query_returns_all_up_to_k() {
        let mgr = InMemoryMemoryManager::new();
        mgr.seed(MemoryReference { id: "m1".to_string(), category: "fact".to_string(), summary: "a".to_string(), score: 0.1 });
        mgr.seed(MemoryReference { id: "m2".to_string(), category: "fact".to_string(), summary: "b".to_string(), score: 0.9 });
        let results = mgr.retrieve("s1", "", 1).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "m2");
    }
}
