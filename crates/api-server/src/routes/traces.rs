//! Persisted run traces

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use bp_core::trace::TraceEnvelope;
use serde::Deserialize;

use crate::routes::error::ApiError;
use crate::state::AppState;

const DEFAULT_TRACE_LIMIT: usize = 50;
const MAX_TRACE_LIMIT: usize = 500;

#[derive(Debug, Deserialize)]
pub struct TraceListQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

/// GET /api/traces - Most recent traces first
async fn list_traces(
    State(state): State<AppState>,
    Query(query): Query<TraceListQuery>,
) -> Result<Json<Vec<TraceEnvelope>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_TRACE_LIMIT)
        .clamp(1, MAX_TRACE_LIMIT);
    let traces = state.store().list_traces(limit).await?;
    Ok(Json(traces))
}

/// GET /api/traces/{run_id} - Latest trace recorded for a run
async fn get_trace(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<TraceEnvelope>, ApiError> {
    let trace = state
        .store()
        .get_trace(&run_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No trace for run {}", run_id)))?;
    Ok(Json(trace))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/traces", get(list_traces))
        .route("/api/traces/{run_id}", get(get_trace))
}
