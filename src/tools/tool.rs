//! Tool trait and closure-based tool wrapper.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use super::arguments::ToolArguments;
use super::types::ToolParameters;
use crate::error::AgentError;
use crate::types::ToolDescriptor;

/// Context available during tool execution.
#[derive(Debug, Clone, Default)]
pub struct ToolExecutionContext {
    /// Thread the call belongs to, when dispatched by the loop.
    pub thread_id: Option<String>,
    pub tool_call_id: Option<String>,
    pub tool_name: Option<String>,
    /// Fires when the dispatcher gives up on the call (timeout). Tools may
    /// observe it to stop early; nothing forces them to.
    pub cancel: CancellationToken,
}

/// Core tool trait; implement to create custom tools.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (must match what the model calls).
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema parameters.
    fn parameters(&self) -> &ToolParameters;

    /// Execute the tool with arguments already validated against
    /// [`parameters`](Self::parameters).
    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<serde_json::Value, AgentError>;

    /// Descriptor advertised to the model.
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameter_schema: self.parameters().schema.clone(),
        }
    }
}

/// Uniform calling convention every registered callable is normalized to.
pub type ToolHandler = Arc<
    dyn Fn(ToolArguments, ToolExecutionContext) -> BoxFuture<'static, Result<serde_json::Value, AgentError>>
        + Send
        + Sync,
>;

/// Closure-based tool for quick tool creation.
pub struct AgentTool {
    name: String,
    description: String,
    parameters: ToolParameters,
    handler: ToolHandler,
}

impl AgentTool {
    /// Create a tool from an async closure.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ToolParameters,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolArguments, ToolExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value, AgentError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Arc::new(move |args, ctx| handler(args, ctx).boxed()),
        }
    }

    /// Create a tool from a blocking closure.
    ///
    /// The closure runs on tokio's blocking pool so it never stalls the
    /// scheduler that dispatched it.
    pub fn blocking<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ToolParameters,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolArguments, ToolExecutionContext) -> Result<serde_json::Value, AgentError>
            + Send
            + Sync
            + 'static,
    {
        let name = name.into();
        let handler = Arc::new(handler);
        let tool_name = name.clone();
        Self {
            name,
            description: description.into(),
            parameters,
            handler: Arc::new(move |args, ctx| {
                let handler = Arc::clone(&handler);
                let tool_name = tool_name.clone();
                async move {
                    match tokio::task::spawn_blocking(move || handler(args, ctx)).await {
                        Ok(result) => result,
                        Err(join_error) => Err(AgentError::tool(
                            tool_name,
                            format!("blocking tool failed: {join_error}"),
                        )),
                    }
                }
                .boxed()
            }),
        }
    }

    /// Pair a descriptor with an already-normalized handler.
    pub fn from_descriptor(descriptor: ToolDescriptor, handler: ToolHandler) -> Self {
        Self {
            name: descriptor.name,
            description: descriptor.description,
            parameters: ToolParameters::from_schema(descriptor.parameter_schema),
            handler,
        }
    }
}

#[async_trait]
impl Tool for AgentTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<serde_json::Value, AgentError> {
        (self.handler)(args.clone(), ctx.clone()).await
    }
}

impl std::fmt::Debug for AgentTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}
