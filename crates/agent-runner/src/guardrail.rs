//! Tool-result validation and bounded retries
//!
//! Every dispatched call is validated. A failing call shape (tool name plus
//! canonical arguments) is told to retry until it has failed
//! `max_attempts` times; from then on it gets a terminal failure instead.

use std::collections::HashMap;

use serde_json::{json, Value};

use crate::tools::{ToolError, ToolName, ToolRef};

/// Default number of retryable validation failures per call shape
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Settled result of one tool call
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    /// Dispatch succeeded and passed validation
    Success(Value),
    /// Validation failed; the planner should retry with corrected arguments
    Retry {
        error: String,
        attempt: u32,
        max_attempts: u32,
    },
    /// Validation kept failing; the planner should stop retrying this call
    Exhausted {
        error: String,
        attempt: u32,
        max_attempts: u32,
    },
    /// Dispatch failed for a reason retries cannot fix
    Error(String),
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Retry { error, .. } | Self::Exhausted { error, .. } | Self::Error(error) => {
                Some(error)
            }
        }
    }

    /// JSON handed back to the planner for this call
    pub fn to_output(&self) -> Value {
        match self {
            Self::Success(value) => value.clone(),
            Self::Retry {
                error,
                attempt,
                max_attempts,
            } => json!({
                "status": "retry",
                "error": error,
                "attempt": attempt,
                "maxAttempts": max_attempts,
                "message": format!(
                    "Validation failed (attempt {} of {}). Fix the arguments and call the tool again.",
                    attempt, max_attempts
                ),
            }),
            Self::Exhausted {
                error,
                attempt,
                max_attempts,
            } => json!({
                "status": "failed",
                "error": error,
                "attempt": attempt,
                "maxAttempts": max_attempts,
                "message": format!(
                    "Validation failed {} times. Do not retry this call.",
                    attempt
                ),
            }),
            Self::Error(error) => json!({
                "status": "error",
                "error": error,
            }),
        }
    }
}

/// Check a dispatched call, returning the validation error if any
pub fn validate(
    tool: &ToolRef,
    args: &Value,
    result: &Result<Value, ToolError>,
) -> Option<String> {
    let name = tool.known()?;

    if let Err(ToolError::InvalidArguments(message)) = result {
        return Some(message.clone());
    }
    if let Some(message) = validate_args(name, args) {
        return Some(message);
    }

    match result {
        Ok(output) => validate_output(name, output),
        Err(_) => None,
    }
}

fn validate_args(name: ToolName, args: &Value) -> Option<String> {
    let missing = name.schema().missing_required(args);
    if !missing.is_empty() {
        return Some(format!("Missing required field(s): {}", missing.join(", ")));
    }

    let blank = |field: &str| {
        args.get(field)
            .and_then(Value::as_str)
            .map_or(false, |s| s.trim().is_empty())
    };

    match name {
        ToolName::GeneratePostCopy | ToolName::CreatePost if blank("content") => {
            Some("`content` must be a non-empty string".to_string())
        }
        ToolName::UpdatePost if blank("postId") => {
            Some("`postId` must be a non-empty string".to_string())
        }
        ToolName::UpdatePost if blank("content") => {
            Some("`content`, when provided, must be a non-empty string".to_string())
        }
        _ => None,
    }
}

fn validate_output(name: ToolName, output: &Value) -> Option<String> {
    if name != ToolName::GeneratePostCopy {
        return None;
    }
    let has_content = output
        .get("postCopy")
        .filter(|copy| copy.is_object())
        .and_then(|copy| copy.get("content"))
        .and_then(Value::as_str)
        .map_or(false, |content| !content.trim().is_empty());

    if has_content {
        None
    } else {
        Some("Result must contain a `postCopy` object with non-empty `content`".to_string())
    }
}

/// Deterministic serialization with object keys sorted at every level
pub fn canonical_json(value: &Value) -> String {
    fn sorted(value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                let mut out = serde_json::Map::new();
                for key in keys {
                    out.insert(key.clone(), sorted(&map[key]));
                }
                Value::Object(out)
            }
            Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
            other => other.clone(),
        }
    }

    sorted(value).to_string()
}

/// Retry key for a call shape
pub fn retry_key(tool: &ToolRef, args: &Value) -> String {
    format!("{}:{}", tool.as_str(), canonical_json(args))
}

/// Per-run validation failure counters
#[derive(Debug, Clone)]
pub struct RetryGuard {
    max_attempts: u32,
    attempts: HashMap<String, u32>,
}

impl Default for RetryGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl RetryGuard {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            attempts: HashMap::new(),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Failures recorded so far for a call shape
    pub fn attempts(&self, tool: &ToolRef, args: &Value) -> u32 {
        self.attempts
            .get(&retry_key(tool, args))
            .copied()
            .unwrap_or(0)
    }

    /// Validate a dispatch result and turn it into an outcome
    pub fn settle(
        &mut self,
        tool: &ToolRef,
        args: &Value,
        result: Result<Value, ToolError>,
    ) -> ToolOutcome {
        if let Some(error) = validate(tool, args, &result) {
            return self.record_failure(tool, args, error);
        }

        match result {
            Ok(value) => ToolOutcome::Success(value),
            Err(err) => ToolOutcome::Error(err.to_string()),
        }
    }

    fn record_failure(&mut self, tool: &ToolRef, args: &Value, error: String) -> ToolOutcome {
        let attempt = self.attempts.entry(retry_key(tool, args)).or_insert(0);
        *attempt += 1;
        let attempt = *attempt;

        tracing::debug!(
            tool = %tool.as_str(),
            attempt,
            max_attempts = self.max_attempts,
            error = %error,
            "Tool call failed validation"
        );

        if attempt <= self.max_attempts {
            ToolOutcome::Retry {
                error,
                attempt,
                max_attempts: self.max_attempts,
            }
        } else {
            ToolOutcome::Exhausted {
                error,
                attempt,
                max_attempts: self.max_attempts,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_post() -> ToolRef {
        ToolRef::Known(ToolName::CreatePost)
    }

    #[test]
    fn test_canonical_json_ignores_key_order() {
        let a = json!({"b": 1, "a": {"y": [1, {"d": 2, "c": 3}], "x": null}});
        let b = json!({"a": {"x": null, "y": [1, {"c": 3, "d": 2}]}, "b": 1});
        assert_eq!(canonical_json(&a), canonical_json(&b));
        assert_eq!(
            retry_key(&create_post(), &a),
            retry_key(&create_post(), &b)
        );
    }

    #[test]
    fn test_valid_call_never_counts_as_failure() {
        let mut guard = RetryGuard::default();
        let args = json!({"brandId": "brand1", "content": "Hello"});

        for _ in 0..5 {
            let outcome = guard.settle(&create_post(), &args, Ok(json!({"id": "p1"})));
            assert!(outcome.is_success());
        }
        assert_eq!(guard.attempts(&create_post(), &args), 0);
    }

    #[test]
    fn test_allows_exactly_max_attempts() {
        let mut guard = RetryGuard::new(3);
        let args = json!({"brandId": "brand1"});
        let dispatch_err = || Err(ToolError::InvalidArguments("missing field `content`".into()));

        for expected in 1..=3 {
            match guard.settle(&create_post(), &args, dispatch_err()) {
                ToolOutcome::Retry {
                    attempt,
                    max_attempts,
                    error,
                } => {
                    assert_eq!(attempt, expected);
                    assert_eq!(max_attempts, 3);
                    assert!(error.contains("content"));
                }
                other => panic!("expected retry, got {:?}", other),
            }
        }

        let outcome = guard.settle(&create_post(), &args, dispatch_err());
        assert!(matches!(outcome, ToolOutcome::Exhausted { attempt: 4, .. }));
        assert_eq!(outcome.to_output()["status"], "failed");
    }

    #[test]
    fn test_counters_are_per_call_shape() {
        let mut guard = RetryGuard::new(3);
        let first = json!({"brandId": "brand1"});
        let second = json!({"brandId": "brand2"});

        guard.settle(&create_post(), &first, Ok(json!({})));
        guard.settle(&create_post(), &first, Ok(json!({})));
        let outcome = guard.settle(&create_post(), &second, Ok(json!({})));

        assert!(matches!(outcome, ToolOutcome::Retry { attempt: 1, .. }));
        assert_eq!(guard.attempts(&create_post(), &first), 2);
        assert_eq!(RetryGuard::new(3).attempts(&create_post(), &first), 0);
    }

    #[test]
    fn test_blank_content_fails_validation() {
        let args = json!({"brandId": "brand1", "content": "  "});
        let error = validate(&create_post(), &args, &Ok(json!({}))).unwrap();
        assert!(error.contains("content"));
    }

    #[test]
    fn test_generate_output_requires_post_copy() {
        let tool = ToolRef::Known(ToolName::GeneratePostCopy);
        let args = json!({"brandId": "brand1", "content": "Hi"});

        assert!(validate(&tool, &args, &Ok(json!({"postCopy": {"content": "Hi"}}))).is_none());
        assert!(validate(&tool, &args, &Ok(json!({"copy": "Hi"}))).is_some());
    }

    #[test]
    fn test_non_validation_errors_are_not_retried() {
        let mut guard = RetryGuard::default();
        let tool = ToolRef::Known(ToolName::GetBrand);
        let args = json!({"brandId": "ghost"});

        let outcome = guard.settle(&tool, &args, Err(ToolError::NotFound("Brand ghost".into())));
        assert_eq!(outcome, ToolOutcome::Error("Not found: Brand ghost".to_string()));
        assert_eq!(outcome.to_output()["status"], "error");
        assert_eq!(guard.attempts(&tool, &args), 0);
    }

    #[test]
    fn test_unknown_tool_is_plain_error() {
        let mut guard = RetryGuard::default();
        let tool = ToolRef::resolve("teleport");

        let outcome = guard.settle(
            &tool,
            &json!({}),
            Err(ToolError::UnknownTool("teleport".into())),
        );
        assert!(matches!(outcome, ToolOutcome::Error(_)));
    }
}
