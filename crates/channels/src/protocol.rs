//! Wire protocol types.
//!
//! Inbound lines are parsed loosely into an `Envelope` first: the channel
//! only needs `type` and `id` to correlate, and the session turns the
//! envelope into a typed `Inbound` at the edge. Outbound messages are a
//! closed set and serialize straight from `Outbound`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A raw inbound JSON object with its correlation fields lifted out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl Envelope {
    /// Accept any JSON object. A missing `type` becomes the empty string and
    /// numeric ids are kept as their decimal text. Non-objects are rejected.
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut body) = value else {
            return None;
        };
        let kind = match body.remove("type") {
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let id = match body.remove("id") {
            Some(Value::String(s)) => Some(s),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };
        Some(Self { kind, id, body })
    }

    pub fn matches(&self, kind: &str, id: Option<&str>) -> bool {
        self.kind == kind && id.is_none_or(|expected| self.id.as_deref() == Some(expected))
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.body.get(key).and_then(Value::as_str)
    }

    pub fn bool_field(&self, key: &str) -> bool {
        self.body.get(key).and_then(Value::as_bool).unwrap_or(false)
    }
}

/// How a user message should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageMode {
    /// Let the router decide between a direct reply and a plan
    #[default]
    Default,
    /// Same as `Default`; kept distinct for hosts that send it
    Ask,
    /// Force planning
    Plan,
    /// Produce a plan without executing it or keeping any memory of it
    PlanOnly,
}

impl MessageMode {
    /// Unknown modes fall back to `Default`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("ask") => MessageMode::Ask,
            Some("plan") => MessageMode::Plan,
            Some("planOnly") | Some("plan_only") => MessageMode::PlanOnly,
            _ => MessageMode::Default,
        }
    }
}

/// Typed inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Message {
        content: String,
        mode: MessageMode,
    },
    ToggleDebug,
    Shutdown,
    ShellApprovalResponse {
        id: Option<String>,
        approved: bool,
        approve_all: bool,
    },
    EditorQueryResponse {
        id: Option<String>,
        result: Option<Value>,
        error: Option<String>,
    },
    Unknown {
        kind: String,
    },
}

impl Inbound {
    pub fn from_envelope(envelope: &Envelope) -> Self {
        match envelope.kind.as_str() {
            "message" => Inbound::Message {
                content: envelope.str_field("content").unwrap_or_default().to_string(),
                mode: MessageMode::parse(envelope.str_field("mode")),
            },
            "toggle_debug" => Inbound::ToggleDebug,
            "shutdown" => Inbound::Shutdown,
            "shell_approval_response" => Inbound::ShellApprovalResponse {
                id: envelope.id.clone(),
                approved: envelope.bool_field("approved"),
                approve_all: envelope.bool_field("approve_all"),
            },
            "editor_query_response" => Inbound::EditorQueryResponse {
                id: envelope.id.clone(),
                result: envelope.body.get("result").cloned(),
                error: envelope
                    .body
                    .get("error")
                    .filter(|v| !v.is_null())
                    .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string())),
            },
            other => Inbound::Unknown {
                kind: other.to_string(),
            },
        }
    }
}

/// Everything Steward writes to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    Ready {
        debug: bool,
    },
    Assistant {
        content: String,
        #[serde(default)]
        debug: Vec<String>,
        #[serde(default)]
        extras: Vec<String>,
    },
    ShellApprovalRequest {
        command: String,
        id: String,
    },
    EditorQuery {
        query: String,
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    Notification {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        debug: Option<bool>,
    },
    Error {
        content: String,
    },
}

impl Outbound {
    pub fn assistant(content: impl Into<String>, debug: Vec<String>, extras: Vec<String>) -> Self {
        Outbound::Assistant {
            content: content.into(),
            debug,
            extras,
        }
    }

    pub fn notification(content: impl Into<String>) -> Self {
        Outbound::Notification {
            content: content.into(),
            debug: None,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Outbound::Error {
            content: content.into(),
        }
    }
}
