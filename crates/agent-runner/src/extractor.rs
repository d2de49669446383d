//! Structured payload extraction from the planner's final answer

use serde::Serialize;
use serde_json::Value;

/// Result field looked up when none is configured
pub const DEFAULT_RESULT_FIELD: &str = "postCopy";

/// Final planner content in one of its three shapes
#[derive(Debug, Clone, PartialEq)]
pub enum PlannerContent {
    /// Already a decoded object
    Structured(Value),
    /// Plain text, possibly JSON wrapped in prose
    Text(String),
    /// A list of message or content fragments
    Fragments(Vec<Value>),
}

impl From<Value> for PlannerContent {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            Value::Array(items) => Self::Fragments(items),
            other => Self::Structured(other),
        }
    }
}

impl From<&str> for PlannerContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStatus {
    Success,
    Failed,
}

/// Outcome of an extraction
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
    pub status: ExtractionStatus,
    /// The result object, `None` on failure
    pub payload: Option<Value>,
    /// The whole decoded document, when decoding succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Extraction {
    fn success(payload: Value, document: Value) -> Self {
        Self {
            status: ExtractionStatus::Success,
            payload: Some(payload),
            document: Some(document),
            error: None,
        }
    }

    fn failed(error: impl Into<String>, document: Option<Value>) -> Self {
        Self {
            status: ExtractionStatus::Failed,
            payload: None,
            document,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ExtractionStatus::Success
    }
}

/// Extract `result_field` from planner content.
///
/// The field is looked up under `payload` first, then at the top level.
pub fn extract(content: impl Into<PlannerContent>, result_field: &str) -> Extraction {
    let document = match normalize(content.into()) {
        Candidate::Object(value) => value,
        Candidate::Text(text) => match decode_text(&text) {
            Some(value) => value,
            None => {
                return Extraction::failed("Final answer does not contain a JSON document", None)
            }
        },
        Candidate::Empty => return Extraction::failed("Final answer is empty", None),
    };

    let found = document
        .get("payload")
        .and_then(|payload| payload.get(result_field))
        .or_else(|| document.get(result_field))
        .cloned();

    match found {
        Some(payload) if payload.is_object() => Extraction::success(payload, document),
        Some(_) => Extraction::failed(
            format!("`{}` in the final answer is not an object", result_field),
            Some(document),
        ),
        None => Extraction::failed(
            format!("Final answer has no `payload.{}` object", result_field),
            Some(document),
        ),
    }
}

enum Candidate {
    Object(Value),
    Text(String),
    Empty,
}

fn normalize(content: PlannerContent) -> Candidate {
    match content {
        PlannerContent::Structured(value) => candidate_from_value(value),
        PlannerContent::Text(text) => Candidate::Text(text),
        PlannerContent::Fragments(items) => {
            let chosen = items
                .iter()
                .rev()
                .find(|item| item.get("role").and_then(Value::as_str) == Some("assistant"))
                .or_else(|| items.last());

            match chosen {
                Some(entry) => match nested_text(entry) {
                    Some(text) => Candidate::Text(text),
                    None => candidate_from_value(entry.get("content").unwrap_or(entry).clone()),
                },
                None => Candidate::Empty,
            }
        }
    }
}

fn candidate_from_value(value: Value) -> Candidate {
    match value {
        Value::String(text) => Candidate::Text(text),
        Value::Null => Candidate::Empty,
        other => Candidate::Object(other),
    }
}

/// Textual value carried by a message or content fragment
fn nested_text(entry: &Value) -> Option<String> {
    let text_of = |part: &Value| -> Option<String> {
        match part.get("text") {
            Some(Value::String(text)) => Some(text.clone()),
            Some(text) => text.get("value").and_then(Value::as_str).map(String::from),
            None => None,
        }
    };

    match entry.get("content") {
        Some(Value::Array(parts)) => parts.iter().find_map(text_of),
        Some(Value::String(text)) => Some(text.clone()),
        _ => text_of(entry),
    }
}

fn decode_text(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }
    find_braced(trimmed).and_then(|candidate| serde_json::from_str(candidate).ok())
}

/// Slice from the first `{` through the last `}`
pub fn find_braced(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}
