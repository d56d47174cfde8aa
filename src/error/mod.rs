//! Error types for the agent loop.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

use crate::checkpoint::CheckpointError;

/// Primary error type for all loop operations.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Model unavailable: {message}")]
    ModelUnavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Run cancelled")]
    Cancelled,

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Tool execution error: {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl AgentError {
    /// Create a model-unavailable error without an underlying source.
    pub fn model_unavailable(message: impl Into<String>) -> Self {
        Self::ModelUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an arbitrary error as model-unavailable, keeping it as the source.
    pub fn model_unavailable_from(
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ModelUnavailable {
            message: error.to_string(),
            source: Some(Box::new(error)),
        }
    }

    /// Create a tool execution error.
    pub fn tool(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ModelUnavailable { .. } => ErrorCategory::Model,
            Self::Cancelled => ErrorCategory::Cancellation,
            Self::Checkpoint(_) => ErrorCategory::Checkpoint,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Io(_) => ErrorCategory::Checkpoint,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::ToolExecution { .. } => ErrorCategory::ToolExecution,
            Self::InvalidArgument(_) => ErrorCategory::InvalidInput,
            Self::InvalidState(_) => ErrorCategory::Unknown,
        }
    }

    /// Whether this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Checkpoint(err) => err.is_transient(),
            _ => matches!(
                self.category(),
                ErrorCategory::Model | ErrorCategory::Timeout | ErrorCategory::Checkpoint
            ),
        }
    }

    /// Whether this error ends a `run()` call (as opposed to being folded
    /// back into the conversation).
    pub fn aborts_run(&self) -> bool {
        matches!(self, Self::ModelUnavailable { .. } | Self::Cancelled)
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.category() {
            ErrorCategory::Model => RecoverySuggestion::ResumeThread,
            ErrorCategory::Checkpoint => RecoverySuggestion::RetryWithBackoff,
            ErrorCategory::Timeout => RecoverySuggestion::IncreaseTimeout,
            ErrorCategory::Configuration => RecoverySuggestion::CheckConfiguration,
            ErrorCategory::ToolExecution => RecoverySuggestion::CheckToolImplementation,
            ErrorCategory::InvalidInput | ErrorCategory::Serialization => {
                RecoverySuggestion::FixInput
            }
            ErrorCategory::Cancellation | ErrorCategory::Unknown => RecoverySuggestion::None,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, AgentError>;
