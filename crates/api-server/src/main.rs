//! API Server for Brandpost
//!
//! Serves the brand/plan REST API and runs planner orchestrations.

mod config;
mod routes;
mod state;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "api_server=debug,agent_runner=debug,bp_core=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!("Using data directory: {:?}", config.data_dir);

    let bind_addr = config.bind_addr;
    let state = AppState::new(config).await?;
    if !state.planner_configured() {
        tracing::warn!("Orchestrations are disabled until the planner is configured");
    }

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("REST API listening on {}", bind_addr);

    axum::serve(listener, routes::router(state)).await?;
    Ok(())
}
