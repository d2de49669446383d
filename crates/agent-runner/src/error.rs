//! Error types for agent-runner

use thiserror::Error;

use crate::planner::RunStatus;

/// Result type alias for orchestration operations
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Errors that end an orchestration.
///
/// Tool failures never surface here: they are converted into tool results
/// and handed back to the planner.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Transport failure talking to the planner
    #[error("Planner request failed: {message}")]
    Planner { message: String },

    /// Planner answered with a non-success HTTP status
    #[error("Planner returned HTTP {status}: {body}")]
    PlannerHttp { status: u16, body: String },

    /// Planner client is missing required configuration
    #[error("Planner is not configured: {0}")]
    NotConfigured(String),

    /// Caller input rejected before a run was opened
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Run reached a terminal status other than completed
    #[error("Run {run_id} ended with status {status}{}", format_reason(.reason))]
    RunFailed {
        run_id: String,
        status: RunStatus,
        reason: Option<String>,
    },

    /// Run completed but no usable payload could be extracted
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// Run was cancelled by the caller
    #[error("Run cancelled")]
    Cancelled,

    /// Run exceeded its deadline
    #[error("Run timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// Run exceeded its maximum number of status polls
    #[error("Run exceeded {polls} status polls")]
    PollLimit { polls: u32 },

    /// Document store failure
    #[error("Storage error: {0}")]
    Store(#[from] bp_core::Error),
}

fn format_reason(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|r| format!(": {}", r))
        .unwrap_or_default()
}

impl OrchestratorError {
    /// Create a Planner transport error
    pub fn planner(message: impl Into<String>) -> Self {
        Self::Planner {
            message: message.into(),
        }
    }

    /// Whether the error comes from talking to the planner
    pub fn is_planner_failure(&self) -> bool {
        matches!(
            self,
            Self::Planner { .. } | Self::PlannerHttp { .. } | Self::RunFailed { .. }
        )
    }
}
