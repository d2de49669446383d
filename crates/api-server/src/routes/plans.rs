//! Plan API endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use bp_core::plan::{Plan, UpsertPlanRequest};

use crate::routes::error::ApiError;
use crate::state::AppState;

/// POST /api/plans - Create or replace a plan for an existing brand
async fn upsert_plan(
    State(state): State<AppState>,
    body: Result<Json<UpsertPlanRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Plan>), ApiError> {
    let Json(req) = body?;
    if req.title.trim().is_empty() {
        return Err(ApiError::bad_request("Plan title cannot be empty"));
    }
    if state.store().get_brand(&req.brand_id).await?.is_none() {
        return Err(ApiError::not_found(format!(
            "Brand not found: {}",
            req.brand_id
        )));
    }

    let plan = state.store().upsert_plan(Plan::from(req)).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

/// GET /api/plans/{id}
async fn get_plan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Plan>, ApiError> {
    let plan = state
        .store()
        .get_plan(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Plan not found: {}", id)))?;
    Ok(Json(plan))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/plans", post(upsert_plan))
        .route("/api/plans/{id}", get(get_plan))
}
