//! Toolloop: a bounded, checkpointed tool-using agent loop.
//!
//! An [`AgentLoopController`](agent_loop::AgentLoopController) alternates
//! between a [`ModelClient`](agent_loop::ModelClient) and the tools in a
//! [`ToolRegistry`](tools::ToolRegistry), persisting each thread's
//! [`ConversationState`](types::ConversationState) in a
//! [`CheckpointStore`](checkpoint::CheckpointStore) so conversations resume
//! across calls.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use toolloop::prelude::*;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(model: Arc<dyn ModelClient>) -> toolloop::error::Result<()> {
//! let mut registry = ToolRegistry::new();
//! registry.register_tool(Arc::new(AgentTool::new(
//!     "ping",
//!     "Check connectivity",
//!     ToolParameters::empty(),
//!     |_args, _ctx| async { Ok(serde_json::json!({ "pong": true })) },
//! )));
//!
//! let controller = AgentLoopController::new(
//!     model,
//!     Arc::new(registry),
//!     Arc::new(MemoryCheckpointStore::new()),
//!     AgentConfig::from_env().with_system_instructions("You are helpful."),
//! );
//! let result = controller
//!     .run("thread-1", Message::user("ping the server"), &CancellationToken::new())
//!     .await?;
//! println!("{}", result.text());
//! # Ok(())
//! # }
//! ```

pub mod agent_loop;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod prelude;
pub mod tools;
pub mod types;
pub mod util;
