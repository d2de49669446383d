//! Orchestration endpoint
//!
//! Parses the request, runs the orchestrator and maps the outcome onto a
//! status code. No orchestration logic lives here.

use agent_runner::{fail_local, OrchestrationRequest, RunReport};
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use tracing::{info, warn};

use crate::routes::error::ApiError;
use crate::state::AppState;

/// POST /api/orchestrations - Run the planner for a brand and plan
async fn run_orchestration(
    State(state): State<AppState>,
    body: Result<Json<OrchestrationRequest>, JsonRejection>,
) -> Result<Json<RunReport>, ApiError> {
    let Json(request) = body?;
    if let Err(error) = request.validate() {
        warn!("Rejected orchestration request: {}", error);
        let agent_name = &state.config().agent_name;
        return Err(fail_local(state.store(), agent_name, error, &request).await.into());
    }
    let orchestrator = state.orchestrator()?;

    info!(
        brand_id = %request.brand_id,
        plan_id = %request.plan_id,
        "Starting orchestration"
    );

    let report = orchestrator.run(request).await?;
    Ok(Json(report))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/orchestrations", post(run_orchestration))
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use agent_runner::{OrchestratorError, Planner, PlannerRun, RunStatus, ToolCall, ToolOutput};
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use chrono::Utc;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::routes::testing::{build_state, seed, test_config};
    use crate::state::AppState;

    /// Planner answering from a fixed list of run states
    struct StubPlanner {
        states: Mutex<VecDeque<(RunStatus, Vec<ToolCall>)>>,
        final_text: String,
    }

    impl StubPlanner {
        fn new(states: Vec<(RunStatus, Vec<ToolCall>)>, final_text: &str) -> Self {
            Self {
                states: Mutex::new(states.into()),
                final_text: final_text.to_string(),
            }
        }

        fn run(status: RunStatus, tool_calls: Vec<ToolCall>) -> PlannerRun {
            PlannerRun {
                id: "run_http".to_string(),
                thread_id: "thread_http".to_string(),
                status,
                created_at: Utc::now(),
                tool_calls,
                last_error: None,
            }
        }
    }

    #[async_trait]
    impl Planner for StubPlanner {
        async fn create_thread(&self) -> agent_runner::Result<String> {
            Ok("thread_http".to_string())
        }

        async fn add_message(&self, _thread_id: &str, _content: &str) -> agent_runner::Result<()> {
            Ok(())
        }

        async fn create_run(&self, _thread_id: &str) -> agent_runner::Result<PlannerRun> {
            Ok(Self::run(RunStatus::Queued, Vec::new()))
        }

        async fn get_run(&self, _thread_id: &str, _run_id: &str) -> agent_runner::Result<PlannerRun> {
            let next = self.states.lock().unwrap().pop_front();
            Ok(match next {
                Some((status, calls)) => Self::run(status, calls),
                None => Self::run(RunStatus::Failed, Vec::new()),
            })
        }

        async fn submit_tool_outputs(
            &self,
            _thread_id: &str,
            _run_id: &str,
            _outputs: &[ToolOutput],
        ) -> agent_runner::Result<PlannerRun> {
            Ok(Self::run(RunStatus::Queued, Vec::new()))
        }

        async fn list_messages(&self, _thread_id: &str) -> agent_runner::Result<Vec<Value>> {
            Ok(vec![json!({
                "role": "assistant",
                "content": [{"type": "text", "text": {"value": self.final_text}}]
            })])
        }

        async fn cancel_run(&self, _thread_id: &str, _run_id: &str) -> agent_runner::Result<()> {
            Err(OrchestratorError::planner("cancel not supported"))
        }
    }

    async fn state_with(planner: StubPlanner) -> (AppState, TempDir) {
        let (state, temp) = build_state().await;
        seed(&state).await;
        let state = AppState::with_planner(
            test_config(temp.path()),
            state.store_arc(),
            Arc::new(planner),
        );
        (state, temp)
    }

    async fn post_orchestration(state: AppState, body: Value) -> (StatusCode, Value) {
        let response = crate::routes::router(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/orchestrations")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn orchestration_returns_result_and_trace() {
        let planner = StubPlanner::new(
            vec![
                (
                    RunStatus::RequiresAction,
                    vec![ToolCall::new("call_1", "get_brand", json!({"brandId": "brand1"}))],
                ),
                (RunStatus::Completed, Vec::new()),
            ],
            r##"Done: {"payload":{"postCopy":{"content":"Fresh roast","hashtags":["#acme"]}}}"##,
        );
        let (state, _temp) = state_with(planner).await;

        let (status, body) =
            post_orchestration(state, json!({"brandId": "brand1", "planId": "plan1"})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["runId"], "run_http");
        assert_eq!(body["status"], "completed");
        assert_eq!(body["result"]["content"], "Fresh roast");
        assert_eq!(body["trace"]["status"], "succeeded");
        assert_eq!(body["trace"]["events"][0]["type"], "start");
    }

    #[tokio::test]
    async fn missing_plan_id_is_bad_request_with_trace() {
        let (state, _temp) = state_with(StubPlanner::new(Vec::new(), "")).await;

        let (status, body) = post_orchestration(state.clone(), json!({"brandId": "brand1"})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_input");
        let run_id = body["runId"].as_str().unwrap();
        assert!(run_id.starts_with("local-"));
        assert_eq!(body["trace"]["status"], "failed");
        assert!(state.store().get_trace(run_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn extraction_failure_is_unprocessable() {
        let planner = StubPlanner::new(
            vec![(RunStatus::Completed, Vec::new())],
            r#"{"summary":"I looked at the brand but wrote nothing."}"#,
        );
        let (state, _temp) = state_with(planner).await;

        let (status, body) =
            post_orchestration(state, json!({"brandId": "brand1", "planId": "plan1"})).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "extraction_failed");
        assert_eq!(body["runId"], "run_http");
        assert!(body["error"]["detail"].as_str().unwrap().contains("postCopy"));
    }

    #[tokio::test]
    async fn failed_run_is_bad_gateway() {
        let planner = StubPlanner::new(vec![(RunStatus::Failed, Vec::new())], "");
        let (state, _temp) = state_with(planner).await;

        let (status, body) =
            post_orchestration(state, json!({"brandId": "brand1", "planId": "plan1"})).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "run_failed");
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let (state, _temp) = state_with(StubPlanner::new(Vec::new(), "")).await;

        let response = crate::routes::router(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/orchestrations")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "invalid_body");
    }

    #[tokio::test]
    async fn invalid_request_is_rejected_before_planner_check() {
        let (state, _temp) = build_state().await;
        assert!(!state.planner_configured());

        let (status, body) = post_orchestration(state.clone(), json!({"brandId": "brand1"})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_input");
        let run_id = body["runId"].as_str().unwrap();
        assert!(run_id.starts_with("local-"));
        assert!(state.store().get_trace(run_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unconfigured_planner_is_reported_at_request_time() {
        let (state, _temp) = build_state().await;

        let (status, body) =
            post_orchestration(state, json!({"brandId": "brand1", "planId": "plan1"})).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "planner_not_configured");
        assert_eq!(body["error"]["detail"], "Planner is not configured: missing API key");
    }
}
