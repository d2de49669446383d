//! Tool catalogue

use agent_runner::tools::FieldSpec;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use serde_json::Value;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub name: &'static str,
    pub description: &'static str,
    pub fields: Vec<FieldSpec>,
    pub parameters: Value,
}

#[derive(Debug, Serialize)]
pub struct ToolsResponse {
    pub tools: Vec<ToolResponse>,
}

/// GET /api/tools - Registered tools and their input schemas
async fn list_tools(State(state): State<AppState>) -> Json<ToolsResponse> {
    let tools = state
        .tools()
        .schemas()
        .into_iter()
        .map(|schema| ToolResponse {
            name: schema.name,
            description: schema.description,
            parameters: schema.parameters(),
            fields: schema.fields,
        })
        .collect();

    Json(ToolsResponse { tools })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/tools", get(list_tools))
}
