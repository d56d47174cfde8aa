//! Checkpoint persistence for conversation state.
//!
//! A [`CheckpointStore`] maps an opaque thread id to the latest committed
//! [`ConversationState`]. `get` never fails: a missing or unreadable
//! checkpoint reads as a fresh thread.

pub mod memory;

#[cfg(feature = "file-store")]
pub mod file;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::ConversationState;

pub use memory::MemoryCheckpointStore;

#[cfg(feature = "file-store")]
pub use file::FileCheckpointStore;

/// Failures a backing store can report from `put` or `clear`.
#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid thread id: {0}")]
    InvalidThreadId(String),

    #[error("Thread id mismatch: key '{key}' does not match state '{state}'")]
    ThreadMismatch { key: String, state: String },

    #[error("Backend error: {0}")]
    Backend(String),
}

impl CheckpointError {
    /// Whether retrying the same write could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Backend(_))
    }
}

/// Storage contract for per-thread conversation state.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Load the state for `thread_id`, or a fresh empty state if none exists.
    async fn get(&self, thread_id: &str) -> ConversationState;

    /// Atomically replace the state for `thread_id`.
    async fn put(&self, thread_id: &str, state: &ConversationState) -> Result<(), CheckpointError>;

    /// Remove the state for `thread_id`. Clearing an unknown thread is not an error.
    async fn clear(&self, thread_id: &str) -> Result<(), CheckpointError>;
}

pub(crate) fn ensure_matching_thread(
    thread_id: &str,
    state: &ConversationState,
) -> Result<(), CheckpointError> {
    if state.thread_id == thread_id {
        Ok(())
    } else {
        Err(CheckpointError::ThreadMismatch {
            key: thread_id.to_string(),
            state: state.thread_id.clone(),
        })
    }
}
