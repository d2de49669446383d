//! Brand API endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use bp_core::brand::{Brand, UpsertBrandRequest};
use bp_core::plan::Plan;
use bp_core::post::Post;
use serde::Deserialize;

use crate::routes::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PostListQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

/// POST /api/brands - Create or replace a brand
async fn upsert_brand(
    State(state): State<AppState>,
    body: Result<Json<UpsertBrandRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Brand>), ApiError> {
    let Json(req) = body?;
    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("Brand name cannot be empty"));
    }

    let brand = state.store().upsert_brand(Brand::from(req)).await?;
    Ok((StatusCode::CREATED, Json(brand)))
}

/// GET /api/brands/{id}
async fn get_brand(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Brand>, ApiError> {
    let brand = state
        .store()
        .get_brand(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Brand not found: {}", id)))?;
    Ok(Json(brand))
}

/// GET /api/brands/{id}/plans
async fn list_brand_plans(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Plan>>, ApiError> {
    Ok(Json(state.store().list_plans(&id).await?))
}

/// GET /api/brands/{id}/posts - Newest first
async fn list_brand_posts(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PostListQuery>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    Ok(Json(state.store().list_posts(&id, limit).await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/brands", post(upsert_brand))
        .route("/api/brands/{id}", get(get_brand))
        .route("/api/brands/{id}/plans", get(list_brand_plans))
        .route("/api/brands/{id}/posts", get(list_brand_posts))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use bp_core::post::Post;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::routes::testing::{build_state, seed};
    use crate::state::AppState;

    async fn send(state: AppState, request: Request<Body>) -> (StatusCode, Value) {
        let response = crate::routes::router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn create_and_fetch_brand() {
        let (state, _temp) = build_state().await;

        let (status, created) = send(
            state.clone(),
            Request::builder()
                .method("POST")
                .uri("/api/brands")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"id": "b7", "name": "Nordic Tea", "hashtags": ["tea", "#Tea"]})
                        .to_string(),
                ))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["hashtags"], json!(["#tea"]));

        let (status, fetched) = send(state, get("/api/brands/b7")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["name"], "Nordic Tea");
    }

    #[tokio::test]
    async fn blank_brand_name_is_rejected() {
        let (state, _temp) = build_state().await;

        let (status, body) = send(
            state,
            Request::builder()
                .method("POST")
                .uri("/api/brands")
                .header("content-type", "application/json")
                .body(Body::from(json!({"name": " "}).to_string()))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_input");
    }

    #[tokio::test]
    async fn brand_plans_and_posts() {
        let (state, _temp) = build_state().await;
        seed(&state).await;
        state
            .store()
            .create_post(Post::new("brand1", "Hello"))
            .await
            .unwrap();

        let (status, plans) = send(state.clone(), get("/api/brands/brand1/plans")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(plans[0]["id"], "plan1");

        let (status, posts) = send(state.clone(), get("/api/brands/brand1/posts")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(posts.as_array().unwrap().len(), 1);

        let (status, _) = send(state, get("/api/brands/ghost")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
