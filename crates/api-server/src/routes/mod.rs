//! Route handlers

pub mod brands;
pub mod error;
pub mod health;
pub mod orchestrations;
pub mod plans;
pub mod tools;
pub mod traces;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the REST router with all endpoints mounted
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(tools::router())
        .merge(brands::router())
        .merge(plans::router())
        .merge(traces::router())
        .merge(orchestrations::router())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
