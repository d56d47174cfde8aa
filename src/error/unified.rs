//! Error classification and recovery hints.

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Model,
    Cancellation,
    Checkpoint,
    Configuration,
    Serialization,
    Timeout,
    ToolExecution,
    InvalidInput,
    Unknown,
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    /// Call `resume` for the same thread once the model is reachable again.
    ResumeThread,
    RetryWithBackoff,
    CheckConfiguration,
    IncreaseTimeout,
    CheckToolImplementation,
    FixInput,
    None,
}
