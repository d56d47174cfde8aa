//! Tool system: definitions, registry, and dispatch.

pub mod arguments;
pub mod dispatcher;
pub mod registry;
pub mod tool;
pub mod types;
pub mod validation;

pub use arguments::ToolArguments;
pub use dispatcher::{ToolDispatcher, DEFAULT_TOOL_TIMEOUT};
pub use registry::ToolRegistry;
pub use tool::{AgentTool, Tool, ToolExecutionContext, ToolHandler};
pub use types::{ParameterBuilder, ToolParameters};
