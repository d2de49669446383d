//! Trace event types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Open key-value structure carried by trace events
pub type Payload = Map<String, Value>;

/// Kind of a trace event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TraceEventKind {
    Start,
    ToolInvoke,
    ToolResult,
    Error,
    End,
    Custom,
}

impl TraceEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::ToolInvoke => "tool-invoke",
            Self::ToolResult => "tool-result",
            Self::Error => "error",
            Self::End => "end",
            Self::Custom => "custom",
        }
    }

    /// Start and end events are owned by the trace lifecycle
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Self::Start | Self::End)
    }
}

/// One immutable record of something that happened during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceEvent {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: TraceEventKind,
    pub agent_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Payload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Payload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Payload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Payload>,
}

/// Optional parts of an event being recorded.
///
/// Unset agent name and timestamp fall back to the trace's owning agent and
/// the current time.
#[derive(Debug, Clone, Default)]
pub struct EventDetails {
    pub tool_name: Option<String>,
    pub agent_name: Option<String>,
    pub input: Option<Payload>,
    pub output: Option<Payload>,
    pub error: Option<Payload>,
    pub metadata: Option<Payload>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl EventDetails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tool(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = Some(tool_name.into());
        self
    }

    pub fn agent(mut self, agent_name: impl Into<String>) -> Self {
        self.agent_name = Some(agent_name.into());
        self
    }

    pub fn input(mut self, input: impl Into<Value>) -> Self {
        self.input = Some(into_payload(input.into()));
        self
    }

    pub fn output(mut self, output: impl Into<Value>) -> Self {
        self.output = Some(into_payload(output.into()));
        self
    }

    pub fn error(mut self, error: impl Into<Value>) -> Self {
        self.error = Some(into_payload(error.into()));
        self
    }

    pub fn metadata(mut self, metadata: impl Into<Value>) -> Self {
        self.metadata = Some(into_payload(metadata.into()));
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Objects are kept as-is; any other value is wrapped as `{"value": ...}`.
pub fn into_payload(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}
