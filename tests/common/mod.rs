//! Shared test helpers: scripted model clients and store wrappers.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use toolloop::agent_loop::ModelClient;
use toolloop::checkpoint::{CheckpointError, CheckpointStore, MemoryCheckpointStore};
use toolloop::error::AgentError;
use toolloop::types::*;

/// A model that replays queued replies and records every transcript it saw.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<Message, AgentError>>>,
    inputs: Mutex<Vec<Vec<Message>>>,
    tool_lists: Mutex<Vec<Vec<ToolDescriptor>>>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            inputs: Mutex::new(Vec::new()),
            tool_lists: Mutex::new(Vec::new()),
            latency: None,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn reply(self, message: Message) -> Self {
        self.replies.lock().unwrap().push_back(Ok(message));
        self
    }

    pub fn reply_text(self, text: &str) -> Self {
        self.reply(Message::assistant(text))
    }

    pub fn reply_tool_calls(self, calls: Vec<ToolCallRequest>) -> Self {
        self.reply(Message::assistant_with_tool_calls("", calls))
    }

    pub fn fail(self, error: AgentError) -> Self {
        self.replies.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn calls(&self) -> usize {
        self.inputs.lock().unwrap().len()
    }

    pub fn input(&self, index: usize) -> Vec<Message> {
        self.inputs.lock().unwrap()[index].clone()
    }

    pub fn tools_seen(&self, index: usize) -> Vec<ToolDescriptor> {
        self.tool_lists.lock().unwrap()[index].clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> Result<Message, AgentError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.inputs.lock().unwrap().push(messages.to_vec());
        self.tool_lists.lock().unwrap().push(tools.to_vec());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Message::assistant("script exhausted")));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        reply
    }
}

/// A model that requests the same tool on every call.
pub struct AlwaysToolModel {
    tool_name: String,
    calls: AtomicUsize,
}

impl AlwaysToolModel {
    pub fn new(tool_name: &str) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelClient for AlwaysToolModel {
    async fn complete(
        &self,
        _messages: &[Message],
        _tools: &[ToolDescriptor],
    ) -> Result<Message, AgentError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Message::assistant_with_tool_calls(
            "",
            vec![ToolCallRequest::new(
                format!("call-{n}"),
                self.tool_name.clone(),
                serde_json::json!({}),
            )],
        ))
    }
}

/// A model that never answers in any reasonable time.
pub struct HangingModel;

#[async_trait]
impl ModelClient for HangingModel {
    async fn complete(
        &self,
        _messages: &[Message],
        _tools: &[ToolDescriptor],
    ) -> Result<Message, AgentError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Message::assistant("too late"))
    }
}

/// Memory store whose writes fail while `failing` is set.
pub struct FlakyStore {
    pub inner: MemoryCheckpointStore,
    pub failing: AtomicBool,
    pub attempts: AtomicUsize,
}

impl FlakyStore {
    pub fn failing() -> Self {
        Self {
            inner: MemoryCheckpointStore::new(),
            failing: AtomicBool::new(true),
            attempts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CheckpointStore for FlakyStore {
    async fn get(&self, thread_id: &str) -> ConversationState {
        self.inner.get(thread_id).await
    }

    async fn put(&self, thread_id: &str, state: &ConversationState) -> Result<(), CheckpointError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(CheckpointError::Backend("store offline".to_string()));
        }
        self.inner.put(thread_id, state).await
    }

    async fn clear(&self, thread_id: &str) -> Result<(), CheckpointError> {
        self.inner.clear(thread_id).await
    }
}

pub fn call(id: &str, tool: &str, args: serde_json::Value) -> ToolCallRequest {
    ToolCallRequest::new(id, tool, args)
}

pub fn roles(messages: &[Message]) -> Vec<Role> {
    messages.iter().map(|m| m.role).collect()
}
