//! Identity: the system prompts every fresh conversation is seeded with.
//!
//! Seeding order is fixed:
//!
//! 1. **OS hint**: tells the model which shell dialect to use
//! 2. **Project instructions**: an optional `agent.md` (any case) found in
//!    the working directory or its `cli/` subdirectory
//! 3. **Tool listing**: the `Available tools:` block built from the registry
//!
//! Missing files are silently skipped.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::tool::ToolRegistry;

/// Well-known project instruction file name (matched case-insensitively).
pub const AGENT_FILE: &str = "agent.md";

/// First line of the tool-listing block. Memory recognises the block by it.
pub const TOOLS_HEADER: &str = "Available tools:";

/// Where to look for project instructions.
#[derive(Debug, Clone, Default)]
pub struct ContextPaths {
    /// Directories searched in order; the first `agent.md` wins.
    pub search_dirs: Vec<PathBuf>,
}

impl ContextPaths {
    /// The working directory and its `cli/` subdirectory.
    pub fn from_working_dir(cwd: &Path) -> Self {
        Self {
            search_dirs: vec![cwd.to_path_buf(), cwd.join("cli")],
        }
    }
}

/// The static part of the agent's system prompt.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Human readable OS family ("Linux", "Windows", ...)
    pub os_name: String,

    /// Contents of `agent.md`, if one was found
    pub project_instructions: Option<String>,

    /// Which file the instructions came from (for diagnostics)
    pub source: Option<PathBuf>,
}

impl Identity {
    /// Load the identity for the given search paths.
    pub fn load(paths: &ContextPaths) -> Self {
        let found = paths
            .search_dirs
            .iter()
            .find_map(|dir| Self::find_agent_file(dir));

        let (source, project_instructions) = match found {
            Some((path, content)) => {
                debug!(file = %path.display(), "Loaded project instructions");
                (Some(path), Some(content))
            }
            None => (None, None),
        };

        Self {
            os_name: os_display_name(std::env::consts::OS).to_string(),
            project_instructions,
            source,
        }
    }

    /// The OS hint system message.
    pub fn os_message(&self) -> String {
        format!(
            "You are running in a {} environment. Use appropriate shell commands for this OS.",
            self.os_name
        )
    }

    /// System messages in seeding order, tool listing last.
    pub fn seed_prompts(&self, tools: &ToolRegistry) -> Vec<String> {
        let mut prompts = vec![self.os_message()];
        if let Some(instructions) = &self.project_instructions {
            prompts.push(instructions.clone());
        }
        prompts.push(build_tools_prompt(tools));
        prompts
    }

    fn find_agent_file(dir: &Path) -> Option<(PathBuf, String)> {
        let entries = match std::fs::read_dir(dir) {
            Ok(rd) => rd,
            Err(_) => return None,
        };

        let mut candidates: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.eq_ignore_ascii_case(AGENT_FILE))
            })
            .collect();
        candidates.sort();

        for path in candidates {
            match std::fs::read_to_string(&path) {
                Ok(content) if !content.trim().is_empty() => return Some((path, content)),
                Ok(_) => {}
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Failed to read project instructions");
                }
            }
        }
        None
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            os_name: os_display_name(std::env::consts::OS).to_string(),
            project_instructions: None,
            source: None,
        }
    }
}

fn os_display_name(os: &str) -> &str {
    match os {
        "linux" => "Linux",
        "macos" => "Darwin",
        "windows" => "Windows",
        "freebsd" => "FreeBSD",
        other => other,
    }
}

/// Render the tool-listing block shown to the model.
pub fn build_tools_prompt(tools: &ToolRegistry) -> String {
    let mut lines = vec![TOOLS_HEADER.to_string()];
    for (name, description) in tools.descriptions() {
        if name == "create_file" {
            lines.push(format!(
                "- {name}: {description} Example: <tool:create_file>test.txt|hello world</tool> \
                 creates test.txt with 'hello world'. Prefer this over shell commands for file creation."
            ));
        } else {
            lines.push(format!("- {name}: {description}"));
        }
    }
    lines.push(
        "IMPORTANT: To call a tool, you MUST reply with <tool:toolname>arguments</tool>. \
         Do not describe the call in prose."
            .to_string(),
    );
    lines.push("Example: <tool:shell>ls -la</tool>".to_string());
    lines.join("\n")
}

/// Whether a system message is the tool-listing block.
pub fn is_tools_prompt(content: &str) -> bool {
    content.contains(TOOLS_HEADER)
}
