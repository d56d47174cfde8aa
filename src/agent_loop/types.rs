//! Run outcome types for the agent loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Message;

/// How a run ended without error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    /// The model answered without requesting tools.
    Completed,
    /// `max_recursions` was reached; the message is the synthetic
    /// bounded-terminal notice.
    LimitReached,
}

/// Result of a `run` or `resume` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub status: RunStatus,
    pub message: Message,
    /// Model invocations in this turn.
    pub recursion_count: usize,
    /// Checkpoint writes that still failed after retrying. The loop kept
    /// going on its in-memory state.
    #[serde(default)]
    pub checkpoint_failures: usize,
    pub finished_at: DateTime<Utc>,
}

impl RunResult {
    pub fn completed(message: Message, recursion_count: usize) -> Self {
        Self {
            status: RunStatus::Completed,
            message,
            recursion_count,
            checkpoint_failures: 0,
            finished_at: Utc::now(),
        }
    }

    pub fn limit_reached(message: Message, recursion_count: usize) -> Self {
        Self {
            status: RunStatus::LimitReached,
            message,
            recursion_count,
            checkpoint_failures: 0,
            finished_at: Utc::now(),
        }
    }

    pub fn is_bounded_terminal(&self) -> bool {
        self.status == RunStatus::LimitReached
    }

    /// Text of the final message.
    pub fn text(&self) -> &str {
        &self.message.content
    }
}
