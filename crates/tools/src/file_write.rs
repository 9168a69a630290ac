//! `create_file`: write a file, creating parent directories.
//!
//! Arguments: `path|content`. Without a `|` the file is created empty.

use async_trait::async_trait;
use steward_core::error::ToolError;
use steward_core::tool::Tool;
use tracing::debug;

use crate::sandbox::Sandbox;

pub struct FileWriteTool {
    sandbox: Sandbox,
}

impl FileWriteTool {
    pub fn new(sandbox: Sandbox) -> Self {
        Self { sandbox }
    }
}

fn failed(reason: impl Into<String>) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: "create_file".into(),
        reason: reason.into(),
    }
}

#[async_trait]
impl Tool for FileWriteTool {
    fn name(&self) -> &str {
        "create_file"
    }

    fn description(&self) -> &str {
        "Create a new file with given content."
    }

    async fn invoke(&self, arguments: &str) -> Result<String, ToolError> {
        if arguments.trim().is_empty() {
            return Err(ToolError::InvalidArguments("no arguments provided.".into()));
        }
        let (path, content) = arguments.split_once('|').unwrap_or((arguments, ""));
        let path = path.trim();

        let resolved = self.sandbox.resolve(path).map_err(|e| ToolError::PermissionDenied {
            tool_name: "create_file".into(),
            reason: e.to_string(),
        })?;

        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| failed(e.to_string()))?;
        }
        tokio::fs::write(&resolved, content)
            .await
            .map_err(|e| failed(e.to_string()))?;

        debug!(path = %resolved.display(), bytes = content.len(), "File written");
        Ok(format!("Created file {path}."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_file_and_parents() {
        let dir = tempfile::tempdir().unwrap();
        let tool = FileWriteTool::new(Sandbox::confined(dir.path()));

        let out = tool.invoke("nested/deep/test.txt|hello world").await.unwrap();
        assert_eq!(out, "Created file nested/deep/test.txt.");
        let written = std::fs::read_to_string(dir.path().join("nested/deep/test.txt")).unwrap();
        assert_eq!(written, "hello world");
    }

    #[tokio::test]
    async fn content_keeps_later_pipes() {
        let dir = tempfile::tempdir().unwrap();
        let tool = FileWriteTool::new(Sandbox::confined(dir.path()));
        tool.invoke("cmd.sh|ls | wc -l").await.unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("cmd.sh")).unwrap(), "ls | wc -l");
    }

    #[tokio::test]
    async fn path_only_creates_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let tool = FileWriteTool::new(Sandbox::confined(dir.path()));
        tool.invoke("empty.txt").await.unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("empty.txt")).unwrap(), "");
    }

    #[tokio::test]
    async fn blank_arguments_are_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let tool = FileWriteTool::new(Sandbox::confined(dir.path()));
        assert!(matches!(tool.invoke("  ").await, Err(ToolError::InvalidArguments(_))));
    }

    #[tokio::test]
    async fn writes_outside_workspace_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let tool = FileWriteTool::new(Sandbox::confined(dir.path().join("ws")));
        let err = tool.invoke("../escape.txt|x").await.unwrap_err();
        assert!(matches!(err, ToolError::PermissionDenied { .. }));
        assert!(!dir.path().join("escape.txt").exists());
    }
}
