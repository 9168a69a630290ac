//! Shell tool: run one command line through the platform shell.
//!
//! This is the shell-class tool; the orchestrator asks a human before every
//! distinct command, so the tool itself carries no allowlist.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use steward_core::error::ToolError;
use steward_core::tool::Tool;
use tokio::process::Command;
use tracing::{debug, warn};

pub struct ShellTool {
    timeout: Duration,
    working_dir: Option<PathBuf>,
}

impl ShellTool {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    fn command(&self, line: &str) -> Command {
        let mut command = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", line]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", line]);
            c
        };
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        command.kill_on_drop(true);
        command
    }
}

fn os_description() -> &'static str {
    if cfg!(target_os = "windows") {
        "Run a shell command and return its output. OS: Windows. Example: \"dir\" to list files, \"type file.txt\" to show a file."
    } else if cfg!(target_os = "macos") {
        "Run a shell command and return its output. OS: macOS. Example: \"ls\" to list files, \"cat file.txt\" to show a file."
    } else {
        "Run a shell command and return its output. OS: Linux. Example: \"ls\" to list files, \"cat file.txt\" to show a file."
    }
}

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> &str {
        "shell"
    }

    fn description(&self) -> &str {
        os_description()
    }

    fn requires_approval(&self) -> bool {
        true
    }

    async fn invoke(&self, arguments: &str) -> Result<String, ToolError> {
        let line = arguments.trim();
        if line.is_empty() {
            return Err(ToolError::InvalidArguments("No command provided.".into()));
        }

        debug!(command = %line, "Executing shell command");

        let output = match tokio::time::timeout(self.timeout, self.command(line).output()).await {
            Ok(result) => result.map_err(|e| ToolError::ExecutionFailed {
                tool_name: "shell".into(),
                reason: e.to_string(),
            })?,
            Err(_) => {
                warn!(command = %line, "Shell command timed out");
                return Err(ToolError::Timeout {
                    tool_name: "shell".into(),
                    timeout_secs: self.timeout.as_secs(),
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            warn!(command = %line, exit_code = code, "Command failed");
            let detail = if stderr.is_empty() { stdout } else { stderr };
            return Ok(format!("Error (code {code}): {detail}"));
        }

        if stdout.is_empty() {
            Ok("(No output)".into())
        } else {
            Ok(stdout)
        }
    }
}
