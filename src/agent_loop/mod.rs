//! The CHAT ↔ TOOLS state machine driving a conversation.

pub mod controller;
pub mod locks;
pub mod model;
pub mod types;

pub use controller::AgentLoopController;
pub use locks::ThreadLocks;
pub use model::ModelClient;
pub use types::{RunResult, RunStatus};
