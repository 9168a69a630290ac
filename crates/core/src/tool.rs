//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools are what give the agent the ability to act in the world:
//! execute shell commands, read/write files, query the editor host, etc.
//! Arguments arrive as the opaque text payload of a `<tool:NAME>...</tool>`
//! directive and tools answer with plain text.

use async_trait::async_trait;
use std::collections::BTreeMap;
use crate::error::ToolError;

/// The core Tool trait.
///
/// Each tool implements this trait and is registered in the `ToolRegistry`
/// by an explicit registration step.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "shell", "read_file").
    fn name(&self) -> &str;

    /// A description of what this tool does (listed to the LLM).
    fn description(&self) -> &str;

    /// Shell-class tools need a human approval before every distinct command.
    fn requires_approval(&self) -> bool {
        false
    }

    /// Execute the tool with the raw argument payload.
    async fn invoke(&self, arguments: &str) -> std::result::Result<String, ToolError>;
}

/// A registry of available tools.
///
/// The orchestrator uses this to:
/// 1. List tool names and descriptions for the prompt
/// 2. Look up and invoke tools when the LLM requests them
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn lookup(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Invoke a tool by name.
    pub async fn invoke(&self, name: &str, arguments: &str) -> std::result::Result<String, ToolError> {
        let tool = self.lookup(name).ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.invoke(arguments).await
    }

    /// Whether the named tool is shell-class. Unknown tools are not.
    pub fn requires_approval(&self, name: &str) -> bool {
        self.lookup(name).is_some_and(|t| t.requires_approval())
    }

    /// `(name, description)` pairs in name order.
    pub fn descriptions(&self) -> Vec<(&str, &str)> {
        self.tools
            .values()
            .map(|t| (t.name(), t.description()))
            .collect()
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
