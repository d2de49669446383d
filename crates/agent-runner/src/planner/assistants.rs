//! Assistants API client
//!
//! Talks to an OpenAI-Assistants-compatible REST API (threads, messages,
//! runs, tool output submission).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{Planner, PlannerRun, RunStatus, ToolCall, ToolOutput};
use crate::error::{OrchestratorError, Result};

/// Configuration for the assistants client
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// API root, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    pub api_key: String,
    /// Assistant that runs every thread
    pub assistant_id: String,
    /// Extra run-level instructions appended to the assistant's own
    pub additional_instructions: Option<String>,
    /// Tool definitions sent with every run; empty keeps the assistant's own
    pub tools: Vec<Value>,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            assistant_id: String::new(),
            additional_instructions: None,
            tools: Vec::new(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireRun {
    id: String,
    thread_id: String,
    status: RunStatus,
    #[serde(default)]
    created_at: i64,
    #[serde(default)]
    required_action: Option<WireRequiredAction>,
    #[serde(default)]
    last_error: Option<WireRunError>,
}

#[derive(Debug, Deserialize)]
struct WireRequiredAction {
    #[serde(default)]
    submit_tool_outputs: Option<WireSubmitToolOutputs>,
}

#[derive(Debug, Deserialize)]
struct WireSubmitToolOutputs {
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct WireRunError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireList {
    #[serde(default)]
    data: Vec<Value>,
}

impl From<WireRun> for PlannerRun {
    fn from(run: WireRun) -> Self {
        let tool_calls = run
            .required_action
            .and_then(|a| a.submit_tool_outputs)
            .map(|s| {
                s.tool_calls
                    .into_iter()
                    .map(|c| ToolCall::new(c.id, c.function.name, c.function.arguments))
                    .collect()
            })
            .unwrap_or_default();

        let last_error = run.last_error.map(|e| match (e.code, e.message) {
            (Some(code), Some(message)) => format!("{}: {}", code, message),
            (Some(code), None) => code,
            (None, Some(message)) => message,
            (None, None) => "unknown error".to_string(),
        });

        Self {
            id: run.id,
            thread_id: run.thread_id,
            status: run.status,
            created_at: Utc
                .timestamp_opt(run.created_at, 0)
                .single()
                .unwrap_or_else(Utc::now),
            tool_calls,
            last_error,
        }
    }
}

/// HTTP client for the assistants planner
pub struct AssistantsClient {
    client: Client,
    config: PlannerConfig,
}

impl AssistantsClient {
    pub fn new(config: PlannerConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(OrchestratorError::NotConfigured("missing API key".into()));
        }
        if config.assistant_id.trim().is_empty() {
            return Err(OrchestratorError::NotConfigured(
                "missing assistant ID".into(),
            ));
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .default_headers(Self::default_headers(&config)?)
            .build()
            .map_err(|e| OrchestratorError::planner(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    fn default_headers(config: &PlannerConfig) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("OpenAI-Beta", HeaderValue::from_static("assistants=v2"));

        let auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| OrchestratorError::NotConfigured("API key is not a valid header value".into()))?;
        headers.insert(AUTHORIZATION, auth);
        Ok(headers)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn send(&self, request: RequestBuilder, action: &str) -> Result<Value> {
        let resp = request
            .send()
            .await
            .map_err(|e| OrchestratorError::planner(format!("Failed to {}: {}", action, e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OrchestratorError::PlannerHttp {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<Value>().await.map_err(|e| {
            OrchestratorError::planner(format!("Failed to parse {} response: {}", action, e))
        })
    }

    fn parse_run(value: Value) -> Result<PlannerRun> {
        let run: WireRun = serde_json::from_value(value)
            .map_err(|e| OrchestratorError::planner(format!("Unexpected run payload: {}", e)))?;
        Ok(run.into())
    }
}

#[async_trait]
impl Planner for AssistantsClient {
    async fn create_thread(&self) -> Result<String> {
        let data = self
            .send(
                self.client.post(self.url("threads")).json(&json!({})),
                "create thread",
            )
            .await?;

        data.get("id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| OrchestratorError::planner("Thread ID not found in response"))
    }

    async fn add_message(&self, thread_id: &str, content: &str) -> Result<()> {
        self.send(
            self.client
                .post(self.url(&format!("threads/{}/messages", thread_id)))
                .json(&json!({ "role": "user", "content": content })),
            "add message",
        )
        .await?;
        debug!(thread_id, "Added message to thread");
        Ok(())
    }

    async fn create_run(&self, thread_id: &str) -> Result<PlannerRun> {
        let mut body = json!({ "assistant_id": self.config.assistant_id });
        if let Some(instructions) = &self.config.additional_instructions {
            body["additional_instructions"] = Value::from(instructions.clone());
        }
        if !self.config.tools.is_empty() {
            body["tools"] = Value::from(self.config.tools.clone());
        }

        let data = self
            .send(
                self.client
                    .post(self.url(&format!("threads/{}/runs", thread_id)))
                    .json(&body),
                "create run",
            )
            .await?;

        let run = Self::parse_run(data)?;
        info!(thread_id, run_id = %run.id, "Created planner run");
        Ok(run)
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<PlannerRun> {
        let data = self
            .send(
                self.client
                    .get(self.url(&format!("threads/{}/runs/{}", thread_id, run_id))),
                "fetch run",
            )
            .await?;
        Self::parse_run(data)
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<PlannerRun> {
        let data = self
            .send(
                self.client
                    .post(self.url(&format!(
                        "threads/{}/runs/{}/submit_tool_outputs",
                        thread_id, run_id
                    )))
                    .json(&json!({ "tool_outputs": outputs })),
                "submit tool outputs",
            )
            .await?;
        Self::parse_run(data)
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Value>> {
        let data = self
            .send(
                self.client
                    .get(self.url(&format!("threads/{}/messages", thread_id)))
                    .query(&[("order", "asc"), ("limit", "100")]),
                "list messages",
            )
            .await?;

        let list: WireList = serde_json::from_value(data).map_err(|e| {
            OrchestratorError::planner(format!("Unexpected message list payload: {}", e))
        })?;
        Ok(list.data)
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<()> {
        self.send(
            self.client
                .post(self.url(&format!("threads/{}/runs/{}/cancel", thread_id, run_id))),
            "cancel run",
        )
        .await?;
        Ok(())
    }
}
