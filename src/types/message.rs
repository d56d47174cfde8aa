//! Message types exchanged with the model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tool::ToolCallResult;

/// A message in a conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    /// Text content. Empty for assistant messages that only carry tool calls.
    #[serde(default)]
    pub content: String,
    /// Tool calls requested by the model, in the order it emitted them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_call_requests: Vec<ToolCallRequest>,
    /// Links a tool message to the request it answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<ToolCallResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_call_requests: Vec::new(),
            tool_call_id: None,
            tool_result: None,
            timestamp: Some(Utc::now()),
        }
    }

    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::with_role(Role::System, text)
    }

    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_role(Role::User, text)
    }

    /// Create an assistant message with no tool calls.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, text)
    }

    /// Create an assistant message that requests tool calls.
    pub fn assistant_with_tool_calls(
        text: impl Into<String>,
        requests: Vec<ToolCallRequest>,
    ) -> Self {
        Self {
            tool_call_requests: requests,
            ..Self::with_role(Role::Assistant, text)
        }
    }

    /// Create a tool message carrying a dispatch result.
    ///
    /// The text content is what text-only model clients see: the serialized
    /// payload on success, `"<kind>: <message>"` on failure.
    pub fn tool(result: ToolCallResult) -> Self {
        Self {
            tool_call_id: Some(result.tool_call_id.clone()),
            content: result.to_content_string(),
            tool_result: Some(result),
            ..Self::with_role(Role::Tool, String::new())
        }
    }

    /// Whether this is an assistant message with at least one tool call.
    pub fn has_tool_calls(&self) -> bool {
        self.role == Role::Assistant && !self.tool_call_requests.is_empty()
    }
}

/// Conversation role.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRequest {
    /// Unique within the owning message only.
    pub id: String,
    pub tool_name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl ToolCallRequest {
    pub fn new(
        id: impl Into<String>,
        tool_name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            tool_name: tool_name.into(),
            arguments,
        }
    }

    /// Create a request with a freshly generated id.
    pub fn with_generated_id(tool_name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self::new(
            format!("call_{}", uuid::Uuid::new_v4().simple()),
            tool_name,
            arguments,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tool::{ToolError, ToolErrorKind};

    #[test]
    fn tool_message_links_request_id_and_serializes_payload() {
        let result = ToolCallResult::success("call-1", serde_json::json!({ "pong": true }));
        let message = Message::tool(result.clone());

        assert_eq!(message.role, Role::Tool);
        assert_eq!(message.tool_call_id.as_deref(), Some("call-1"));
        assert_eq!(message.content, r#"{"pong":true}"#);
        assert_eq!(message.tool_result, Some(result));
    }

    #[test]
    fn tool_error_message_names_the_kind() {
        let result = ToolCallResult::failure(
            "call-2",
            ToolError::new(ToolErrorKind::ToolNotFound, "Tool 'missing' not found"),
        );
        let message = Message::tool(result);

        assert_eq!(message.content, "ToolNotFound: Tool 'missing' not found");
    }

    #[test]
    fn only_assistant_messages_report_tool_calls() {
        let request = ToolCallRequest::new("a", "ping", serde_json::json!({}));
        let assistant = Message::assistant_with_tool_calls("", vec![request.clone()]);
        let mut user = Message::user("hi");
        user.tool_call_requests.push(request);

        assert!(assistant.has_tool_calls());
        assert!(!user.has_tool_calls());
    }

    #[test]
    fn role_parses_from_lowercase_name() {
        assert_eq!("assistant".parse::<Role>().unwrap(), Role::Assistant);
        assert_eq!(Role::Tool.to_string(), "tool");
    }

    #[test]
    fn empty_optional_fields_are_omitted_from_json() {
        let json = serde_json::to_value(Message::user("hello")).unwrap();

        assert!(json.get("tool_call_requests").is_none());
        assert!(json.get("tool_call_id").is_none());
        assert_eq!(json["role"], "user");
    }

    #[test]
    fn generated_request_ids_are_unique() {
        let a = ToolCallRequest::with_generated_id("ping", serde_json::json!({}));
        let b = ToolCallRequest::with_generated_id("ping", serde_json::json!({}));

        assert!(a.id.starts_with("call_"));
        assert_ne!(a.id, b.id);
    }
}
