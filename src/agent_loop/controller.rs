//! Agent loop controller.
//!
//! Drives one thread through `CHAT → TOOLS → CHAT → … → END`:
//!
//! - **CHAT** asks the [`ModelClient`] for the next assistant message.
//! - **TOOLS** dispatches every requested call in model order and appends one
//!   tool message per request.
//! - **END** is reached when the model stops requesting tools or the turn
//!   hits `max_recursions`.
//!
//! State is checkpointed after every transition. Only model failure and
//! cancellation end a run early; tool failures become tool messages the
//! model can react to.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::locks::ThreadLocks;
use super::model::ModelClient;
use super::types::RunResult;
use crate::checkpoint::CheckpointStore;
use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use crate::tools::{ToolDispatcher, ToolRegistry};
use crate::types::{
    ConversationState, ConversationStatus, Message, Role, ToolCallRequest, ToolCallResult,
    ToolError, ToolErrorKind,
};

enum Node {
    Chat,
    Tools(Vec<ToolCallRequest>),
    End(RunResult),
}

/// Cancellation scope for one run; fires on the caller's token or the
/// configured deadline, and shuts its deadline timer down on drop.
struct RunScope {
    token: CancellationToken,
}

impl RunScope {
    fn new(parent: &CancellationToken, config: &AgentConfig, thread_id: &str) -> Self {
        let token = parent.child_token();
        if let Some(deadline) = config.run_deadline {
            let timer_token = token.clone();
            let thread_id = thread_id.to_string();
            tokio::spawn(async move {
                tokio::select! {
                    _ = timer_token.cancelled() => {}
                    _ = tokio::time::sleep(deadline) => {
                        tracing::warn!(thread_id = %thread_id, deadline_ms = deadline.as_millis() as u64, "run deadline reached");
                        timer_token.cancel();
                    }
                }
            });
        }
        Self { token }
    }

    fn ensure_active(&self) -> Result<()> {
        if self.token.is_cancelled() {
            Err(AgentError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Drop for RunScope {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Runs conversations against a model, a tool registry and a checkpoint store.
///
/// Calls for the same thread id are serialized internally; different threads
/// run concurrently.
pub struct AgentLoopController {
    model: Arc<dyn ModelClient>,
    dispatcher: ToolDispatcher,
    store: Arc<dyn CheckpointStore>,
    config: AgentConfig,
    locks: ThreadLocks,
}

impl AgentLoopController {
    pub fn new(
        model: Arc<dyn ModelClient>,
        registry: Arc<ToolRegistry>,
        store: Arc<dyn CheckpointStore>,
        config: AgentConfig,
    ) -> Self {
        let dispatcher = ToolDispatcher::new(registry).with_timeout(config.per_tool_timeout);
        Self {
            model,
            dispatcher,
            store,
            config,
            locks: ThreadLocks::new(),
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        self.dispatcher.registry()
    }

    pub fn store(&self) -> &Arc<dyn CheckpointStore> {
        &self.store
    }

    /// Append `message` to the thread and drive the loop to an end state.
    ///
    /// A new thread gets the configured system message first. Each call
    /// starts a new turn, so `recursion_count` restarts at zero.
    pub async fn run(
        &self,
        thread_id: &str,
        message: Message,
        cancel: &CancellationToken,
    ) -> Result<RunResult> {
        let _guard = self.locks.acquire(thread_id).await;
        let scope = RunScope::new(cancel, &self.config, thread_id);
        scope.ensure_active()?;

        let mut state = self.store.get(thread_id).await;
        self.resolve_dangling_calls(&mut state);
        if state.is_fresh() {
            state.push(Message::system(self.config.system_instructions.clone()));
        }
        state.push(message);
        state.recursion_count = 0;
        state.status = ConversationStatus::Active;

        tracing::debug!(
            thread_id,
            messages = state.messages.len(),
            "run start"
        );
        let mut failures = 0;
        self.commit(&mut state, &mut failures).await;
        self.drive(state, failures, &scope).await
    }

    /// Continue a thread from its last checkpoint without adding a message.
    ///
    /// Use this to retry after [`AgentError::ModelUnavailable`]: the user
    /// message is already persisted, so calling `run` again would duplicate
    /// it. An ended thread returns its last answer without calling the model.
    pub async fn resume(&self, thread_id: &str, cancel: &CancellationToken) -> Result<RunResult> {
        let _guard = self.locks.acquire(thread_id).await;
        let scope = RunScope::new(cancel, &self.config, thread_id);
        scope.ensure_active()?;

        let mut state = self.store.get(thread_id).await;
        if state.is_fresh() {
            return Err(AgentError::InvalidState(format!(
                "thread '{thread_id}' has nothing to resume"
            )));
        }
        if state.is_ended() {
            return Ok(self.ended_result(&state));
        }

        let mut failures = 0;
        if self.resolve_dangling_calls(&mut state) {
            self.commit(&mut state, &mut failures).await;
        }
        tracing::debug!(thread_id, recursion_count = state.recursion_count, "resume");
        self.drive(state, failures, &scope).await
    }

    /// Forget the thread. The next `run` starts from a fresh state.
    pub async fn reset(&self, thread_id: &str) -> Result<()> {
        let _guard = self.locks.acquire(thread_id).await;
        self.store.clear(thread_id).await?;
        tracing::debug!(thread_id, "thread reset");
        Ok(())
    }

    /// Current checkpoint for the thread.
    pub async fn state(&self, thread_id: &str) -> ConversationState {
        self.store.get(thread_id).await
    }

    async fn drive(
        &self,
        mut state: ConversationState,
        mut failures: usize,
        scope: &RunScope,
    ) -> Result<RunResult> {
        let mut node = Node::Chat;
        loop {
            node = match node {
                Node::Chat => self.chat(&mut state, &mut failures, scope).await?,
                Node::Tools(requests) => {
                    self.tools(&mut state, requests, &mut failures, scope).await?
                }
                Node::End(mut result) => {
                    result.checkpoint_failures = failures;
                    tracing::debug!(
                        thread_id = %state.thread_id,
                        status = %result.status,
                        recursion_count = result.recursion_count,
                        "run end"
                    );
                    return Ok(result);
                }
            };
        }
    }

    async fn chat(
        &self,
        state: &mut ConversationState,
        failures: &mut usize,
        scope: &RunScope,
    ) -> Result<Node> {
        if state.recursion_count >= self.config.max_recursions {
            let notice = Message::assistant(format!(
                "Stopped after reaching the limit of {} model invocations for this turn.",
                self.config.max_recursions
            ));
            state.push(notice.clone());
            state.status = ConversationStatus::Ended;
            self.commit(state, failures).await;
            return Ok(Node::End(RunResult::limit_reached(
                notice,
                state.recursion_count,
            )));
        }

        scope.ensure_active()?;
        let descriptors = self.registry().list_descriptors();
        let reply = tokio::select! {
            biased;
            _ = scope.token.cancelled() => return Err(AgentError::Cancelled),
            reply = self.model.complete(&state.messages, &descriptors) => reply,
        };
        let reply = match reply {
            Ok(reply) => normalize_reply(reply),
            Err(err @ (AgentError::Cancelled | AgentError::ModelUnavailable { .. })) => {
                tracing::warn!(thread_id = %state.thread_id, error = %err, "model call failed");
                return Err(err);
            }
            Err(err) => {
                tracing::warn!(thread_id = %state.thread_id, error = %err, "model call failed");
                return Err(AgentError::model_unavailable_from(err));
            }
        };

        state.recursion_count += 1;
        state.push(reply.clone());
        tracing::debug!(
            thread_id = %state.thread_id,
            iteration = state.recursion_count,
            tool_calls = reply.tool_call_requests.len(),
            "model replied"
        );

        if reply.tool_call_requests.is_empty() {
            state.status = ConversationStatus::Ended;
            self.commit(state, failures).await;
            return Ok(Node::End(RunResult::completed(reply, state.recursion_count)));
        }

        self.commit(state, failures).await;
        Ok(Node::Tools(reply.tool_call_requests))
    }

    async fn tools(
        &self,
        state: &mut ConversationState,
        requests: Vec<ToolCallRequest>,
        failures: &mut usize,
        scope: &RunScope,
    ) -> Result<Node> {
        // Each result is committed before the next cancellation check, so a
        // tool that ran is never reported as cancelled later.
        for request in &requests {
            scope.ensure_active()?;
            let result = self
                .dispatcher
                .dispatch_for_thread(Some(&state.thread_id), request)
                .await;
            if let Some(error) = result.error() {
                tracing::debug!(
                    thread_id = %state.thread_id,
                    tool = %request.tool_name,
                    kind = %error.kind,
                    "tool call failed"
                );
            }
            state.push(Message::tool(result));
            self.commit(state, failures).await;
        }
        Ok(Node::Chat)
    }

    /// Close tool calls an interrupted run never dispatched.
    ///
    /// They are never executed later; each gets a `Cancelled` result so the
    /// transcript stays well-formed for the model.
    fn resolve_dangling_calls(&self, state: &mut ConversationState) -> bool {
        let pending = state.pending_tool_calls();
        if pending.is_empty() {
            return false;
        }
        tracing::warn!(
            thread_id = %state.thread_id,
            pending = pending.len(),
            "closing tool calls from an interrupted run"
        );
        for request in pending {
            state.push(Message::tool(ToolCallResult::failure(
                request.id,
                ToolError::new(
                    ToolErrorKind::Cancelled,
                    format!(
                        "Tool '{}' was not run because the run was cancelled",
                        request.tool_name
                    ),
                ),
            )));
        }
        true
    }

    fn ended_result(&self, state: &ConversationState) -> RunResult {
        let message = state
            .last_assistant()
            .cloned()
            .unwrap_or_else(|| Message::assistant(String::new()));
        if state.recursion_count >= self.config.max_recursions {
            RunResult::limit_reached(message, state.recursion_count)
        } else {
            RunResult::completed(message, state.recursion_count)
        }
    }

    /// Persist the state, retrying per config. A write that still fails is
    /// logged and counted; the in-memory state stays authoritative for the
    /// rest of the run.
    async fn commit(&self, state: &mut ConversationState, failures: &mut usize) {
        state.touch();
        let snapshot: &ConversationState = state;
        let store = &self.store;
        let outcome = self
            .config
            .checkpoint_retry
            .execute(|| async move {
                store
                    .put(&snapshot.thread_id, snapshot)
                    .await
                    .map_err(AgentError::from)
            })
            .await;
        if let Err(err) = outcome {
            *failures += 1;
            tracing::warn!(
                thread_id = %snapshot.thread_id,
                error = %err,
                "checkpoint write failed"
            );
        }
    }
}

impl std::fmt::Debug for AgentLoopController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentLoopController")
            .field("dispatcher", &self.dispatcher)
            .field("config", &self.config)
            .finish()
    }
}

/// Coerce whatever the model returned into an assistant message.
fn normalize_reply(mut reply: Message) -> Message {
    reply.role = Role::Assistant;
    reply.tool_call_id = None;
    reply.tool_result = None;
    if reply.timestamp.is_none() {
        reply.timestamp = Some(chrono::Utc::now());
    }
    reply
}
