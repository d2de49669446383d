//! Structured error envelope shared by all routes

use agent_runner::{OrchestratorError, RunFailure};
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bp_core::trace::TraceRecord;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: ErrorBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<TraceRecord>,
}

/// An error answered with `{ error: { code, message, detail? } }`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                error: ErrorBody {
                    code,
                    message: message.into(),
                    detail: None,
                },
                run_id: None,
                trace: None,
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_input", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.body.error.detail = Some(detail.into());
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<bp_core::Error> for ApiError {
    fn from(err: bp_core::Error) -> Self {
        match &err {
            e if e.is_not_found() => Self::not_found(e.to_string()),
            bp_core::Error::InvalidInput(msg) => Self::bad_request(msg.clone()),
            e => {
                tracing::error!("Storage failure: {}", e);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage_error",
                    "Document store failure",
                )
                .with_detail(e.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_body", "Malformed request body")
            .with_detail(rejection.body_text())
    }
}

/// Status code and error code for an orchestration error
pub fn classify(error: &OrchestratorError) -> (StatusCode, &'static str) {
    match error {
        OrchestratorError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
        OrchestratorError::Extraction(_) => (StatusCode::UNPROCESSABLE_ENTITY, "extraction_failed"),
        OrchestratorError::Planner { .. } | OrchestratorError::PlannerHttp { .. } => {
            (StatusCode::BAD_GATEWAY, "planner_error")
        }
        OrchestratorError::RunFailed { .. } => (StatusCode::BAD_GATEWAY, "run_failed"),
        OrchestratorError::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
        OrchestratorError::PollLimit { .. } => (StatusCode::GATEWAY_TIMEOUT, "poll_limit"),
        OrchestratorError::NotConfigured(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "planner_not_configured")
        }
        OrchestratorError::Cancelled => (StatusCode::INTERNAL_SERVER_ERROR, "cancelled"),
        OrchestratorError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
    }
}

fn message_for(error: &OrchestratorError) -> &'static str {
    match error {
        OrchestratorError::InvalidInput(_) => "Invalid orchestration request",
        OrchestratorError::Extraction(_) => "Planner finished without a usable result",
        OrchestratorError::Planner { .. } | OrchestratorError::PlannerHttp { .. } => {
            "Planner request failed"
        }
        OrchestratorError::RunFailed { .. } => "Planner run did not complete",
        OrchestratorError::Timeout { .. } | OrchestratorError::PollLimit { .. } => {
            "Planner run took too long"
        }
        OrchestratorError::NotConfigured(_) => "Planner is not configured",
        OrchestratorError::Cancelled => "Orchestration was cancelled",
        OrchestratorError::Store(_) => "Document store failure",
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(error: OrchestratorError) -> Self {
        let (status, code) = classify(&error);
        Self::new(status, code, message_for(&error)).with_detail(error.to_string())
    }
}

impl From<RunFailure> for ApiError {
    fn from(failure: RunFailure) -> Self {
        let mut err = ApiError::from(failure.error);
        err.body.run_id = failure.run_id;
        err.body.trace = failure.trace;
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_runner::RunStatus;

    #[test]
    fn test_classify_orchestration_errors() {
        let cases = [
            (OrchestratorError::InvalidInput("x".into()), 400),
            (OrchestratorError::Extraction("x".into()), 422),
            (OrchestratorError::planner("down"), 502),
            (
                OrchestratorError::RunFailed {
                    run_id: "run_1".into(),
                    status: RunStatus::Failed,
                    reason: None,
                },
                502,
            ),
            (OrchestratorError::Timeout { seconds: 30 }, 504),
            (OrchestratorError::Cancelled, 500),
        ];

        for (error, expected) in cases {
            assert_eq!(classify(&error).0.as_u16(), expected, "{}", error);
        }
    }

    #[test]
    fn test_run_failure_envelope_keeps_run_id() {
        let failure = RunFailure {
            error: OrchestratorError::Extraction("no payload".into()),
            run_id: Some("run_1".into()),
            trace: None,
        };
        let err = ApiError::from(failure);

        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        let body = serde_json::to_value(&err.body).unwrap();
        assert_eq!(body["runId"], "run_1");
        assert_eq!(body["error"]["code"], "extraction_failed");
        assert_eq!(body["error"]["detail"], "Extraction failed: no payload");
        assert!(body.get("trace").is_none());
    }
}
