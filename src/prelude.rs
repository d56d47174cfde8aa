//! Convenience re-exports for common use.

pub use crate::agent_loop::{AgentLoopController, ModelClient, RunResult, RunStatus};
pub use crate::checkpoint::{CheckpointError, CheckpointStore, MemoryCheckpointStore};
pub use crate::config::AgentConfig;
pub use crate::error::{AgentError, Result};
pub use crate::tools::{
    AgentTool, Tool, ToolArguments, ToolDispatcher, ToolExecutionContext, ToolParameters,
    ToolRegistry,
};
pub use crate::types::{
    ConversationState, ConversationStatus, Message, Role, ToolCallRequest, ToolCallResult,
    ToolDescriptor, ToolError, ToolErrorKind,
};

#[cfg(feature = "file-store")]
pub use crate::checkpoint::FileCheckpointStore;
