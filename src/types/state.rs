//! Persisted per-thread conversation state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::{Message, Role, ToolCallRequest};

/// Lifecycle status of a conversation.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationStatus {
    #[default]
    Active,
    Ended,
}

/// Snapshot of one thread: ordered transcript plus loop bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub thread_id: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Model invocations in the current turn.
    #[serde(default)]
    pub recursion_count: usize,
    #[serde(default)]
    pub status: ConversationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

// `updated_at` is bookkeeping; two states with the same transcript and
// counters are the same checkpoint.
impl PartialEq for ConversationState {
    fn eq(&self, other: &Self) -> bool {
        self.thread_id == other.thread_id
            && self.messages == other.messages
            && self.recursion_count == other.recursion_count
            && self.status == other.status
    }
}

impl ConversationState {
    /// A fresh, empty state for `thread_id`.
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            messages: Vec::new(),
            recursion_count: 0,
            status: ConversationStatus::Active,
            updated_at: None,
        }
    }

    /// True until the first message is appended.
    pub fn is_fresh(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_ended(&self) -> bool {
        self.status == ConversationStatus::Ended
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Most recent assistant message, if any.
    pub fn last_assistant(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::Assistant)
    }

    /// Tool calls of the trailing assistant message that have no result yet.
    ///
    /// Results are matched by position, not id: ids are only unique per
    /// message and a model may repeat one.
    pub fn pending_tool_calls(&self) -> Vec<ToolCallRequest> {
        let Some(index) = self
            .messages
            .iter()
            .rposition(|m| m.role == Role::Assistant)
        else {
            return Vec::new();
        };
        let assistant = &self.messages[index];
        let answered = self.messages[index + 1..]
            .iter()
            .take_while(|m| m.role == Role::Tool)
            .count();
        let trailing = self.messages.len() - index - 1;
        if trailing != answered {
            // Something other than tool results follows; the turn moved on.
            return Vec::new();
        }
        assistant
            .tool_call_requests
            .iter()
            .skip(answered)
            .cloned()
            .collect()
    }

    pub fn role_sequence(&self) -> Vec<Role> {
        self.messages.iter().map(|m| m.role).collect()
    }
}
