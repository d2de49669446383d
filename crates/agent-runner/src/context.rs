//! State owned by one orchestration run

use serde_json::{Map, Value};

use crate::guardrail::RetryGuard;
use crate::tools::{ToolName, ToolRef};

/// Brand and plan context carried across iterations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CarriedContext {
    pub brand_id: Option<String>,
    pub plan_id: Option<String>,
    /// Topics of the last fetched plan
    pub topics: Vec<String>,
    pub published_post_id: Option<String>,
}

impl CarriedContext {
    pub fn new(brand_id: impl Into<String>, plan_id: impl Into<String>) -> Self {
        Self {
            brand_id: Some(brand_id.into()),
            plan_id: Some(plan_id.into()),
            ..Self::default()
        }
    }

    pub fn first_topic(&self) -> Option<&str> {
        self.topics
            .iter()
            .map(|t| t.trim())
            .find(|t| !t.is_empty())
    }

    /// Track identifiers the planner passes to tools
    pub fn observe_args(&mut self, args: &Value) {
        if let Some(brand_id) = non_empty_str(args.get("brandId")) {
            self.brand_id = Some(brand_id.to_string());
        }
        if let Some(plan_id) = non_empty_str(args.get("planId")) {
            self.plan_id = Some(plan_id.to_string());
        }
    }

    /// Track records returned by successful tool calls
    pub fn observe_result(&mut self, tool: &ToolRef, output: &Value) {
        match tool.known() {
            Some(ToolName::GetBrand) => {
                if let Some(id) = non_empty_str(output.get("id")) {
                    self.brand_id = Some(id.to_string());
                }
            }
            Some(ToolName::GetPlan) => {
                if let Some(id) = non_empty_str(output.get("id")) {
                    self.plan_id = Some(id.to_string());
                }
                if let Some(topics) = output.get("topics").and_then(Value::as_array) {
                    self.topics = topics
                        .iter()
                        .filter_map(Value::as_str)
                        .map(String::from)
                        .collect();
                }
            }
            _ => {}
        }
    }

    /// Fill derivable optional fields that the planner left out.
    ///
    /// Returns the names of the fields that were filled.
    pub fn apply_defaults(&self, tool: &ToolRef, args: &mut Value) -> Vec<&'static str> {
        let mut filled = Vec::new();
        if !(tool.is(ToolName::GeneratePostCopy) || tool.is(ToolName::CreatePost)) {
            return filled;
        }
        let Some(map) = args.as_object_mut() else {
            return filled;
        };

        if is_blank(map, "topic") {
            if let Some(topic) = self.first_topic() {
                map.insert("topic".to_string(), Value::from(topic));
                filled.push("topic");
            }
        }
        if is_blank(map, "planId") {
            if let Some(plan_id) = &self.plan_id {
                map.insert("planId".to_string(), Value::from(plan_id.as_str()));
                filled.push("planId");
            }
        }

        filled
    }

    /// Arguments for a publish call built from generated post copy
    pub fn publish_args(&self, generated: &Value) -> Option<Value> {
        let copy = generated.get("postCopy")?.as_object()?;
        let content = copy.get("content")?.as_str()?.trim();
        if content.is_empty() {
            return None;
        }

        let mut args = Map::new();
        let brand_id = non_empty_str(copy.get("brandId"))
            .map(String::from)
            .or_else(|| self.brand_id.clone())?;
        args.insert("brandId".to_string(), Value::from(brand_id));

        let plan_id = copy
            .get("planId")
            .and_then(Value::as_str)
            .map(String::from)
            .or_else(|| self.plan_id.clone());
        if let Some(plan_id) = plan_id {
            args.insert("planId".to_string(), Value::from(plan_id));
        }

        let topic = copy
            .get("topic")
            .and_then(Value::as_str)
            .or_else(|| self.first_topic());
        if let Some(topic) = topic {
            args.insert("topic".to_string(), Value::from(topic));
        }

        args.insert("content".to_string(), Value::from(content));
        for field in ["comment", "hashtags"] {
            if let Some(value) = copy.get(field) {
                args.insert(field.to_string(), value.clone());
            }
        }

        Some(Value::Object(args))
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn is_blank(map: &Map<String, Value>, field: &str) -> bool {
    match map.get(field) {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

/// Mutable state of one run, never shared between runs
#[derive(Debug, Clone)]
pub struct RunState {
    pub guard: RetryGuard,
    pub context: CarriedContext,
    /// `requires_action` rounds handled so far
    pub iterations: u32,
}

impl RunState {
    pub fn new(max_attempts: u32, context: CarriedContext) -> Self {
        Self {
            guard: RetryGuard::new(max_attempts),
            context,
            iterations: 0,
        }
    }
}
