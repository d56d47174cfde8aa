//! Tool descriptors and dispatch results.

use serde::{Deserialize, Serialize};

/// Description of a tool as advertised to the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// JSON Schema object describing the arguments.
    pub parameter_schema: serde_json::Value,
}

/// Failure classes a dispatch can produce. None of them abort the loop.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, strum::Display, strum::EnumString,
)]
pub enum ToolErrorKind {
    ToolNotFound,
    ToolValidationError,
    ToolExecutionError,
    ToolTimeout,
    /// The call was never executed because its run was cancelled.
    Cancelled,
}

/// Structured tool failure, persisted alongside the conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub message: String,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(tool_name: &str) -> Self {
        Self::new(
            ToolErrorKind::ToolNotFound,
            format!("Tool '{tool_name}' not found"),
        )
    }
}

/// Success payload or error, never both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ToolOutcome {
    Content(serde_json::Value),
    Error(ToolError),
}

/// Result of dispatching one [`ToolCallRequest`](super::ToolCallRequest).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallResult {
    pub tool_call_id: String,
    pub outcome: ToolOutcome,
}

impl ToolCallResult {
    pub fn success(tool_call_id: impl Into<String>, content: serde_json::Value) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            outcome: ToolOutcome::Content(content),
        }
    }

    pub fn failure(tool_call_id: impl Into<String>, error: ToolError) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            outcome: ToolOutcome::Error(error),
        }
    }

    pub fn content(&self) -> Option<&serde_json::Value> {
        match &self.outcome {
            ToolOutcome::Content(value) => Some(value),
            ToolOutcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ToolError> {
        match &self.outcome {
            ToolOutcome::Content(_) => None,
            ToolOutcome::Error(error) => Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Error(_))
    }

    pub fn error_kind(&self) -> Option<ToolErrorKind> {
        self.error().map(|e| e.kind)
    }

    /// Text rendering used as the tool message content.
    pub fn to_content_string(&self) -> String {
        match &self.outcome {
            ToolOutcome::Content(serde_json::Value::String(text)) => text.clone(),
            ToolOutcome::Content(value) => value.to_string(),
            ToolOutcome::Error(error) => error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_and_error_are_mutually_exclusive() {
        let ok = ToolCallResult::success("1", json!({ "n": 1 }));
        let err = ToolCallResult::failure("2", ToolError::not_found("x"));

        assert_eq!(ok.content(), Some(&json!({ "n": 1 })));
        assert!(ok.error().is_none());
        assert!(err.content().is_none());
        assert_eq!(err.error_kind(), Some(ToolErrorKind::ToolNotFound));
    }

    #[test]
    fn outcome_serializes_as_single_tagged_key() {
        let err = ToolCallResult::failure(
            "2",
            ToolError::new(ToolErrorKind::ToolTimeout, "slow"),
        );
        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(json["outcome"]["error"]["kind"], "ToolTimeout");
        assert!(json["outcome"].get("content").is_none());
    }

    #[test]
    fn string_payload_is_rendered_without_quotes() {
        let ok = ToolCallResult::success("1", json!("plain text"));
        assert_eq!(ok.to_content_string(), "plain text");
    }
}
