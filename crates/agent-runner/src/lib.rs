//! Agent Runner - drives planner runs for content generation
//!
//! This crate provides functionality for running a remote planner
//! (an Assistants-style API) against local brand, plan and post tools:
//! tool dispatch, argument validation with bounded retries, structured
//! output extraction and per-run tracing.

mod context;
mod error;
mod extractor;
mod guardrail;
mod orchestrator;
mod planner;
pub mod tools;

#[cfg(test)]
mod testing;

pub use context::{CarriedContext, RunState};
pub use error::{OrchestratorError, Result};
pub use extractor::{extract, find_braced, Extraction, ExtractionStatus, PlannerContent, DEFAULT_RESULT_FIELD};
pub use guardrail::{canonical_json, retry_key, validate, RetryGuard, ToolOutcome, DEFAULT_MAX_ATTEMPTS};
pub use orchestrator::{fail_local, OrchestrationRequest, Orchestrator, OrchestratorConfig, RunFailure, RunReport};
pub use planner::{AssistantsClient, Planner, PlannerConfig, PlannerRun, RunStatus, ToolCall, ToolOutput};
pub use tools::{ToolName, ToolRegistry, ToolSchema};
