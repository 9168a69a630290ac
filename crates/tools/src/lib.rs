//! Built-in tool implementations for Steward.
//!
//! Tools give the agent the ability to interact with the world:
//! run shell commands, read and write files in the workspace, and ask the
//! editor host about diagnostics, open editors and symbols.

pub mod editor;
pub mod file_read;
pub mod file_write;
pub mod list_dir;
pub mod sandbox;
pub mod shell;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use steward_config::ToolsConfig;
use steward_core::host::HostQuery;
use steward_core::tool::ToolRegistry;

pub use editor::{EditorQueryKind, EditorTool, format_diagnostics, parse_editor_payload};
pub use sandbox::{Sandbox, SandboxError};

/// Create a tool registry with all built-in tools rooted at `workspace`.
///
/// Editor tools are only registered when a host is available.
pub fn default_registry(
    config: &ToolsConfig,
    workspace: &Path,
    host: Option<Arc<dyn HostQuery>>,
) -> ToolRegistry {
    let sandbox = if config.sandbox_to_workspace {
        Sandbox::confined(workspace)
    } else {
        Sandbox::open(workspace)
    };

    let mut registry = ToolRegistry::new();
    registry.register(Box::new(
        shell::ShellTool::new(Duration::from_secs(config.shell_timeout_secs)).with_working_dir(workspace),
    ));
    registry.register(Box::new(file_read::FileReadTool::new(sandbox.clone())));
    registry.register(Box::new(file_write::FileWriteTool::new(sandbox.clone())));
    registry.register(Box::new(list_dir::ListDirTool::new(sandbox)));
    if let Some(host) = host {
        for tool in EditorTool::all(host) {
            registry.register(Box::new(tool));
        }
    }
    registry
}
