//! `read_file`: file contents, optionally a 1-based inclusive line range.
//!
//! Arguments: `path` or `path|start|end` (either bound may be left empty).

use async_trait::async_trait;
use steward_core::error::ToolError;
use steward_core::tool::Tool;

use crate::sandbox::Sandbox;

pub struct FileReadTool {
    sandbox: Sandbox,
}

impl FileReadTool {
    pub fn new(sandbox: Sandbox) -> Self {
        Self { sandbox }
    }
}

fn failed(reason: impl Into<String>) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: "read_file".into(),
        reason: reason.into(),
    }
}

fn parse_bound(raw: Option<&str>) -> Result<Option<usize>, ToolError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(text) => text
            .parse::<usize>()
            .map(Some)
            .map_err(|_| ToolError::InvalidArguments(format!("'{text}' is not a line number"))),
    }
}

#[async_trait]
impl Tool for FileReadTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read file contents by line range. Args: path or path|start|end."
    }

    async fn invoke(&self, arguments: &str) -> Result<String, ToolError> {
        let mut parts = arguments.split('|');
        let path = parts.next().map(str::trim).unwrap_or_default();
        if path.is_empty() {
            return Err(ToolError::InvalidArguments("no path provided".into()));
        }
        let start = parse_bound(parts.next())?;
        let end = parse_bound(parts.next())?;

        let resolved = self.sandbox.resolve(path).map_err(|e| ToolError::PermissionDenied {
            tool_name: "read_file".into(),
            reason: e.to_string(),
        })?;
        if !resolved.exists() {
            return Err(failed(format!("{path} not found.")));
        }

        let content = tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|e| failed(e.to_string()))?;

        if start.is_none() && end.is_none() {
            return Ok(content);
        }

        let lines: Vec<&str> = content.split_inclusive('\n').collect();
        let from = start.map(|s| s.saturating_sub(1)).unwrap_or(0).min(lines.len());
        let to = end.unwrap_or(lines.len()).min(lines.len()).max(from);
        let selected = lines[from..to].concat();
        if selected.is_empty() {
            Ok("(No content in specified range)".into())
        } else {
            Ok(selected)
        }
    }
}
