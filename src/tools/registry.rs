//! Named tool registry.

use std::collections::HashMap;
use std::sync::Arc;

use super::tool::{AgentTool, Tool, ToolHandler};
use crate::types::{ToolDescriptor, ToolError};

/// Holds the tools a loop may call.
///
/// Mutation takes `&mut self`; build the registry at startup, then share it
/// as `Arc<ToolRegistry>` for concurrent reads.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor with its callable. Last write for a name wins;
    /// a replaced tool keeps its original position in
    /// [`list_descriptors`](Self::list_descriptors).
    pub fn register(&mut self, descriptor: ToolDescriptor, handler: ToolHandler) {
        self.register_tool(Arc::new(AgentTool::from_descriptor(descriptor, handler)));
    }

    pub fn register_tool(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some(&slot) => {
                tracing::debug!(tool = %name, "replacing registered tool");
                self.tools[slot] = tool;
            }
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Builder-style registration.
    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.register_tool(Arc::new(tool));
        self
    }

    /// Descriptors in registration order. This is the tool list the model sees.
    pub fn list_descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|tool| tool.descriptor()).collect()
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>, ToolError> {
        self.index
            .get(name)
            .map(|&slot| Arc::clone(&self.tools[slot]))
            .ok_or_else(|| ToolError::not_found(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
