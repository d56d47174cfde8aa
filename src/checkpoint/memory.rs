//! In-memory checkpoint store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ensure_matching_thread, CheckpointError, CheckpointStore};
use crate::types::ConversationState;

/// In-memory storage for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    entries: RwLock<HashMap<String, ConversationState>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of threads with a stored checkpoint.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn thread_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn get(&self, thread_id: &str) -> ConversationState {
        self.entries
            .read()
            .await
            .get(thread_id)
            .cloned()
            .unwrap_or_else(|| ConversationState::new(thread_id))
    }

    async fn put(&self, thread_id: &str, state: &ConversationState) -> Result<(), CheckpointError> {
        ensure_matching_thread(thread_id, state)?;
        self.entries
            .write()
            .await
            .insert(thread_id.to_string(), state.clone());
        Ok(())
    }

    async fn clear(&self, thread_id: &str) -> Result<(), CheckpointError> {
        self.entries.write().await.remove(thread_id);
        Ok(())
    }
}
