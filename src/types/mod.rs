//! Core data model: messages, tool results, conversation state.

pub mod message;
pub mod state;
pub mod tool;

pub use message::*;
pub use state::*;
pub use tool::*;
