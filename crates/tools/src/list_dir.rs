//! `list_dir`: sorted directory entries, one per line.

use async_trait::async_trait;
use steward_core::error::ToolError;
use steward_core::tool::Tool;

use crate::sandbox::Sandbox;

pub struct ListDirTool {
    sandbox: Sandbox,
}

impl ListDirTool {
    pub fn new(sandbox: Sandbox) -> Self {
        Self { sandbox }
    }
}

fn failed(reason: impl Into<String>) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: "list_dir".into(),
        reason: reason.into(),
    }
}

#[async_trait]
impl Tool for ListDirTool {
    fn name(&self) -> &str {
        "list_dir"
    }

    fn description(&self) -> &str {
        "Directory listing (files and subfolders)."
    }

    async fn invoke(&self, arguments: &str) -> Result<String, ToolError> {
        let path = match arguments.trim() {
            "" => ".",
            other => other,
        };
        let resolved = self.sandbox.resolve(path).map_err(|e| ToolError::PermissionDenied {
            tool_name: "list_dir".into(),
            reason: e.to_string(),
        })?;
        if !resolved.exists() {
            return Err(failed(format!("{path} not found.")));
        }

        let mut reader = tokio::fs::read_dir(&resolved)
            .await
            .map_err(|e| failed(e.to_string()))?;
        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await.map_err(|e| failed(e.to_string()))? {
            entries.push(entry.file_name().to_string_lossy().into_owned());
        }
        entries.sort();
        Ok(entries.join("\n"))
    }
}
