//! Safe execution of a single tool call.
//!
//! [`ToolDispatcher::dispatch`] never fails: a missing tool, invalid
//! arguments, a tool error, a panic or a timeout all come back as an
//! error-carrying [`ToolCallResult`] the loop can hand to the model.
//!
//! Every execution runs as its own tokio task that the caller joins on, so an
//! async tool never has to be driven to completion from inside a scheduler
//! that is already running. Synchronous callers use
//! [`ToolDispatcher::dispatch_blocking`], which picks a strategy based on
//! whether the calling thread already belongs to a runtime.

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::{Builder, Handle};

use super::arguments::ToolArguments;
use super::registry::ToolRegistry;
use super::tool::{Tool, ToolExecutionContext};
use super::validation::validate_arguments;
use crate::types::{ToolCallRequest, ToolCallResult, ToolError, ToolErrorKind};

/// Default per-tool timeout.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(60);

// Slack for the worker thread to report its own timeout before the caller
// stops waiting on the channel.
const WORKER_GRACE: Duration = Duration::from_millis(250);

struct PreparedCall {
    tool: Arc<dyn Tool>,
    args: ToolArguments,
    ctx: ToolExecutionContext,
}

/// Resolves, validates and executes tool calls against a [`ToolRegistry`].
#[derive(Debug, Clone)]
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Execute one request from async code.
    pub async fn dispatch(&self, request: &ToolCallRequest) -> ToolCallResult {
        self.dispatch_for_thread(None, request).await
    }

    /// Like [`dispatch`](Self::dispatch), recording the owning thread in the
    /// tool's execution context.
    pub async fn dispatch_for_thread(
        &self,
        thread_id: Option<&str>,
        request: &ToolCallRequest,
    ) -> ToolCallResult {
        match self.prepare(thread_id, request) {
            Ok(call) => execute(call, request.id.clone(), self.timeout).await,
            Err(error) => ToolCallResult::failure(request.id.clone(), error),
        }
    }

    /// Execute one request from synchronous code.
    ///
    /// Without an active runtime on this thread, a fresh current-thread
    /// runtime drives the call here. Inside a runtime, blocking on it would
    /// deadlock or panic, so the call moves to a dedicated worker thread with
    /// its own runtime while this thread waits.
    pub fn dispatch_blocking(&self, request: &ToolCallRequest) -> ToolCallResult {
        let call = match self.prepare(None, request) {
            Ok(call) => call,
            Err(error) => return ToolCallResult::failure(request.id.clone(), error),
        };
        let id = request.id.clone();
        let timeout = self.timeout;

        if Handle::try_current().is_err() {
            return run_on_fresh_runtime(call, id, timeout);
        }

        let (tx, rx) = mpsc::channel();
        let worker_id = id.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("tool-{}", request.tool_name))
            .spawn(move || {
                let _ = tx.send(run_on_fresh_runtime(call, worker_id, timeout));
            });
        if let Err(err) = spawned {
            return ToolCallResult::failure(
                id,
                ToolError::new(
                    ToolErrorKind::ToolExecutionError,
                    format!("failed to start tool worker: {err}"),
                ),
            );
        }

        match rx.recv_timeout(timeout + WORKER_GRACE) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => timeout_result(id, &request.tool_name, timeout),
            Err(mpsc::RecvTimeoutError::Disconnected) => ToolCallResult::failure(
                id,
                ToolError::new(
                    ToolErrorKind::ToolExecutionError,
                    "tool worker exited without a result",
                ),
            ),
        }
    }

    fn prepare(
        &self,
        thread_id: Option<&str>,
        request: &ToolCallRequest,
    ) -> Result<PreparedCall, ToolError> {
        let tool = self.registry.resolve(&request.tool_name)?;

        validate_arguments(&request.arguments, &tool.parameters().schema).map_err(|reason| {
            ToolError::new(
                ToolErrorKind::ToolValidationError,
                format!("Argument validation failed for '{}': {reason}", request.tool_name),
            )
        })?;

        Ok(PreparedCall {
            tool,
            args: ToolArguments::new(request.arguments.clone()),
            ctx: ToolExecutionContext {
                thread_id: thread_id.map(str::to_string),
                tool_call_id: Some(request.id.clone()),
                tool_name: Some(request.tool_name.clone()),
                ..ToolExecutionContext::default()
            },
        })
    }
}

fn run_on_fresh_runtime(call: PreparedCall, id: String, timeout: Duration) -> ToolCallResult {
    let runtime = match Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            return ToolCallResult::failure(
                id,
                ToolError::new(
                    ToolErrorKind::ToolExecutionError,
                    format!("failed to start tool runtime: {err}"),
                ),
            );
        }
    };
    let result = runtime.block_on(execute(call, id, timeout));
    // A timed-out tool may still be running; leave it behind instead of
    // waiting for it on drop.
    runtime.shutdown_background();
    result
}

async fn execute(call: PreparedCall, id: String, timeout: Duration) -> ToolCallResult {
    let PreparedCall { tool, args, ctx } = call;
    let name = tool.name().to_string();
    let cancel = ctx.cancel.clone();

    tracing::debug!(tool = %name, tool_call_id = %id, "dispatching tool call");
    let task = tokio::spawn(async move { tool.execute(&args, &ctx).await });

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(Ok(content))) => ToolCallResult::success(id, content),
        Ok(Ok(Err(err))) => {
            tracing::debug!(tool = %name, error = %err, "tool returned an error");
            let message = match err {
                crate::error::AgentError::ToolExecution { message, .. } => message,
                other => other.to_string(),
            };
            ToolCallResult::failure(id, ToolError::new(ToolErrorKind::ToolExecutionError, message))
        }
        Ok(Err(join_error)) => {
            let message = if join_error.is_panic() {
                format!("tool '{name}' panicked")
            } else {
                format!("tool '{name}' was aborted")
            };
            tracing::warn!(tool = %name, "{message}");
            ToolCallResult::failure(id, ToolError::new(ToolErrorKind::ToolExecutionError, message))
        }
        Err(_) => {
            // Dropping the join handle detaches the task; the token lets
            // cooperative tools notice.
            cancel.cancel();
            tracing::warn!(tool = %name, timeout_ms = timeout.as_millis() as u64, "tool call timed out");
            timeout_result(id, &name, timeout)
        }
    }
}

fn timeout_result(id: String, tool_name: &str, timeout: Duration) -> ToolCallResult {
    ToolCallResult::failure(
        id,
        ToolError::new(
            ToolErrorKind::ToolTimeout,
            format!("Tool '{tool_name}' timed out after {}ms", timeout.as_millis()),
        ),
    )
}
