//! Planning entity interface
//!
//! The planner is a remote, stateful agent: it holds a conversation
//! (thread), runs it, and either asks for tool outputs or finishes with a
//! final message.

mod assistants;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

pub use assistants::{AssistantsClient, PlannerConfig};

/// Status of a planner run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Completed,
    Failed,
    Cancelled,
    Expired,
    Incomplete,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::RequiresAction => "requires_action",
            Self::Cancelling => "cancelling",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
            Self::Incomplete => "incomplete",
        }
    }

    /// Still being worked on by the planner; keep polling
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Queued | Self::InProgress | Self::Cancelling)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tool call requested by the planner while a run requires action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    /// Correlates the submitted output with this call
    pub id: String,
    pub name: String,
    /// Either a JSON object or a JSON-encoded string
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Output submitted back to the planner for one tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

/// Snapshot of a planner run
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerRun {
    pub id: String,
    pub thread_id: String,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
    /// Pending tool calls, only populated in `requires_action`
    pub tool_calls: Vec<ToolCall>,
    pub last_error: Option<String>,
}

/// Operations consumed from the planning entity
#[async_trait]
pub trait Planner: Send + Sync {
    /// Open a new conversation, returning its ID
    async fn create_thread(&self) -> Result<String>;

    /// Append a user message to a conversation
    async fn add_message(&self, thread_id: &str, content: &str) -> Result<()>;

    /// Start a run over a conversation
    async fn create_run(&self, thread_id: &str) -> Result<PlannerRun>;

    /// Fetch the current state of a run
    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<PlannerRun>;

    /// Submit every output of one `requires_action` round at once
    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<PlannerRun>;

    /// Messages of a conversation, oldest first, in the planner's raw shape
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Value>>;

    /// Ask the planner to stop a run
    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<()>;
}
