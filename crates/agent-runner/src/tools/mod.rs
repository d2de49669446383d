//! Local tools the planner can call
//!
//! Tool names form a closed set ([`ToolName`]); anything else the planner
//! asks for resolves to [`ToolRef::Unknown`] and is answered with an error
//! result instead of being dispatched.

mod brand;
mod plan;
mod post;
mod registry;
mod schema;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

pub use brand::GetBrandTool;
pub use plan::{GetPlanTool, ListPlansTool};
pub use post::{CreatePostTool, GeneratePostCopyTool, ListPostsTool, UpdatePostTool};
pub use registry::ToolRegistry;
pub use schema::{FieldSpec, FieldType, ToolSchema};

/// Known tool names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolName {
    GetBrand,
    GetPlan,
    ListPlans,
    ListPosts,
    GeneratePostCopy,
    CreatePost,
    UpdatePost,
}

impl ToolName {
    pub const ALL: [ToolName; 7] = [
        Self::GetBrand,
        Self::GetPlan,
        Self::ListPlans,
        Self::ListPosts,
        Self::GeneratePostCopy,
        Self::CreatePost,
        Self::UpdatePost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetBrand => "get_brand",
            Self::GetPlan => "get_plan",
            Self::ListPlans => "list_plans",
            Self::ListPosts => "list_posts",
            Self::GeneratePostCopy => "generate_post_copy",
            Self::CreatePost => "create_post",
            Self::UpdatePost => "update_post",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tool name as requested by the planner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolRef {
    Known(ToolName),
    Unknown(String),
}

impl ToolRef {
    pub fn resolve(name: &str) -> Self {
        match ToolName::parse(name) {
            Some(tool) => Self::Known(tool),
            None => Self::Unknown(name.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Known(tool) => tool.as_str(),
            Self::Unknown(name) => name,
        }
    }

    pub fn known(&self) -> Option<ToolName> {
        match self {
            Self::Known(tool) => Some(*tool),
            Self::Unknown(_) => None,
        }
    }

    pub fn is(&self, tool: ToolName) -> bool {
        self.known() == Some(tool)
    }
}

/// Errors produced while executing a tool
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Store(String),
}

impl From<bp_core::Error> for ToolError {
    fn from(err: bp_core::Error) -> Self {
        match err {
            bp_core::Error::InvalidInput(msg) => Self::InvalidArguments(msg),
            e if e.is_not_found() => Self::NotFound(e.to_string()),
            e => Self::Store(e.to_string()),
        }
    }
}

/// Per-run information handed to every tool invocation
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub run_id: String,
}

/// An executable tool
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> ToolName;

    fn schema(&self) -> ToolSchema {
        self.name().schema()
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError>;
}

/// Decode tool arguments into a typed struct
pub(crate) fn decode_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// Trimmed, non-empty string or an `InvalidArguments` error naming the field
pub(crate) fn require_text(value: &str, field: &str) -> Result<String, ToolError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ToolError::InvalidArguments(format!(
            "`{}` must not be empty",
            field
        )));
    }
    Ok(trimmed.to_string())
}

/// Trimmed optional text, blank treated as absent
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}
