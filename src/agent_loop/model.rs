//! Boundary to the language model.

use async_trait::async_trait;

use crate::error::AgentError;
use crate::types::{Message, ToolDescriptor};

/// A model that turns a transcript into the next assistant message.
///
/// Which provider or model sits behind it is up to the implementation. The
/// returned message may request zero or more tool calls. Any error is
/// reported to callers of the loop as [`AgentError::ModelUnavailable`],
/// except [`AgentError::Cancelled`], which passes through.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> Result<Message, AgentError>;
}
