//! Editor host tools (`editor.*`).
//!
//! Each tool forwards one structured query to the host through a
//! `HostQuery` and renders the answer as text. Host failures, including
//! timeouts, come back as readable strings rather than tool errors so the
//! model can explain them.

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use steward_core::error::ToolError;
use steward_core::host::HostQuery;
use steward_core::tool::Tool;
use tracing::warn;

const PER_FILE_LIMIT: usize = 5;
const SEVERITY_ORDER: [&str; 4] = ["error", "warning", "information", "hint"];

/// Which host query a tool issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorQueryKind {
    Diagnostics,
    OpenEditors,
    WorkspaceInfo,
    DocumentSymbols,
}

impl EditorQueryKind {
    pub const ALL: [EditorQueryKind; 4] = [
        EditorQueryKind::Diagnostics,
        EditorQueryKind::OpenEditors,
        EditorQueryKind::WorkspaceInfo,
        EditorQueryKind::DocumentSymbols,
    ];

    /// Wire name of the query.
    pub fn query(&self) -> &'static str {
        match self {
            EditorQueryKind::Diagnostics => "diagnostics",
            EditorQueryKind::OpenEditors => "open_editors",
            EditorQueryKind::WorkspaceInfo => "workspace_info",
            EditorQueryKind::DocumentSymbols => "document_symbols",
        }
    }

    fn tool_name(&self) -> &'static str {
        match self {
            EditorQueryKind::Diagnostics => "editor.diagnostics",
            EditorQueryKind::OpenEditors => "editor.open_editors",
            EditorQueryKind::WorkspaceInfo => "editor.workspace_info",
            EditorQueryKind::DocumentSymbols => "editor.document_symbols",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            EditorQueryKind::Diagnostics => {
                "Inspect editor diagnostics. Args: optional JSON with path/severity/limit or a file path string."
            }
            EditorQueryKind::OpenEditors => "List currently visible editors and selections in the editor.",
            EditorQueryKind::WorkspaceInfo => "Fetch workspace folders and active file from the editor.",
            EditorQueryKind::DocumentSymbols => {
                "List document symbols for the active file or a provided path (JSON input: {\"path\": ...})."
            }
        }
    }

    fn failure_label(&self) -> &'static str {
        match self {
            EditorQueryKind::Diagnostics => "Diagnostics",
            EditorQueryKind::OpenEditors => "Open editors",
            EditorQueryKind::WorkspaceInfo => "Workspace info",
            EditorQueryKind::DocumentSymbols => "Document symbols",
        }
    }
}

pub struct EditorTool {
    kind: EditorQueryKind,
    host: Arc<dyn HostQuery>,
}

impl EditorTool {
    pub fn new(kind: EditorQueryKind, host: Arc<dyn HostQuery>) -> Self {
        Self { kind, host }
    }

    /// One tool per query kind, all sharing `host`.
    pub fn all(host: Arc<dyn HostQuery>) -> Vec<EditorTool> {
        EditorQueryKind::ALL
            .into_iter()
            .map(|kind| EditorTool::new(kind, host.clone()))
            .collect()
    }

    fn payload(&self, arguments: &str) -> Option<Value> {
        let parsed = parse_editor_payload(arguments);
        match self.kind {
            EditorQueryKind::Diagnostics => (!parsed.is_empty()).then(|| Value::Object(parsed)),
            EditorQueryKind::DocumentSymbols => Some(Value::Object(parsed)),
            EditorQueryKind::OpenEditors | EditorQueryKind::WorkspaceInfo => None,
        }
    }
}

#[async_trait]
impl Tool for EditorTool {
    fn name(&self) -> &str {
        self.kind.tool_name()
    }

    fn description(&self) -> &str {
        self.kind.description()
    }

    async fn invoke(&self, arguments: &str) -> Result<String, ToolError> {
        let result = match self.host.query(self.kind.query(), self.payload(arguments)).await {
            Ok(result) => result,
            Err(e) => {
                warn!(query = self.kind.query(), error = %e, "Editor query failed");
                return Ok(format!("{} query failed: {e}", self.kind.failure_label()));
            }
        };
        Ok(match self.kind {
            EditorQueryKind::Diagnostics => format_diagnostics(&result),
            _ => pretty(&result),
        })
    }
}

/// Interpret free-text tool arguments as a query payload.
///
/// Blank text is an empty object, a JSON object is used as-is, any other
/// JSON value is wrapped as `{"value": ...}` and non-JSON text is taken to
/// be a path.
pub fn parse_editor_payload(arguments: &str) -> Map<String, Value> {
    let text = arguments.trim();
    if text.is_empty() {
        return Map::new();
    }
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            let mut map = Map::new();
            map.insert("value".into(), other);
            map
        }
        Err(_) => {
            let mut map = Map::new();
            map.insert("path".into(), Value::String(text.to_string()));
            map
        }
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Scalar rendering for summary counts (`?` when absent).
fn scalar(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "?".into(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn position<'a>(diag: &'a Value, key: &str) -> Option<&'a Value> {
    diag.get("range")?.get("start")?.get(key)
}

fn severity_rank(diag: &Value) -> usize {
    let severity = diag.get("severity").and_then(Value::as_str).unwrap_or("hint");
    SEVERITY_ORDER
        .iter()
        .position(|s| *s == severity)
        .unwrap_or(SEVERITY_ORDER.len())
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(_) => true,
    }
}

/// Render a diagnostics result as a compact per-file summary.
pub fn format_diagnostics(result: &Value) -> String {
    let Some(object) = result.as_object() else {
        return pretty(result);
    };
    let empty = json!({});
    let summary = object.get("summary").unwrap_or(&empty);
    let count = |key: &str| summary.get(key).map(|v| scalar(Some(v))).unwrap_or_else(|| "0".into());

    let mut lines = vec![
        "Diagnostics Summary:".to_string(),
        format!(
            "  Errors: {} | Warnings: {} | Info: {} | Hints: {}",
            count("error"),
            count("warning"),
            count("information"),
            count("hint")
        ),
        format!(
            "  Returned: {} of {}{}",
            scalar(object.get("returned")),
            scalar(object.get("total")),
            if truthy(object.get("truncated")) { " (truncated)" } else { "" }
        ),
    ];

    let items = object.get("items").and_then(Value::as_array).cloned().unwrap_or_default();
    if items.is_empty() {
        lines.push("No diagnostics reported.".into());
        return lines.join("\n");
    }

    lines.push("\nFiles:".into());
    for entry in &items {
        let file = ["uri", "file"]
            .iter()
            .filter_map(|key| entry.get(*key).and_then(Value::as_str))
            .find(|s| !s.is_empty())
            .unwrap_or("(unknown file)");
        let mut diagnostics = entry
            .get("diagnostics")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        if diagnostics.is_empty() {
            continue;
        }
        lines.push(format!("  {file}"));

        diagnostics.sort_by_key(|d| {
            (
                severity_rank(d),
                position(d, "line").and_then(Value::as_i64).unwrap_or(0),
                position(d, "character").and_then(Value::as_i64).unwrap_or(0),
            )
        });

        for diag in diagnostics.iter().take(PER_FILE_LIMIT) {
            let severity = capitalize(diag.get("severity").and_then(Value::as_str).unwrap_or("unknown"));
            let line = position(diag, "line").map(|v| scalar(Some(v))).unwrap_or_else(|| "?".into());
            let character = position(diag, "character")
                .map(|v| scalar(Some(v)))
                .unwrap_or_else(|| "?".into());
            let message = diag.get("message").and_then(Value::as_str).unwrap_or("(no message)");

            let extra: Vec<String> = ["source", "code"]
                .iter()
                .filter_map(|key| diag.get(*key).filter(|v| truthy(Some(v))))
                .map(|v| scalar(Some(v)))
                .collect();
            let extra = if extra.is_empty() {
                String::new()
            } else {
                format!(" ({})", extra.join(", "))
            };
            lines.push(format!("    - {severity} L{line}:{character}{extra}: {message}"));
        }
        if diagnostics.len() > PER_FILE_LIMIT {
            lines.push(format!("    … {} more entries", diagnostics.len() - PER_FILE_LIMIT));
        }
    }
    lines.join("\n")
}
