use std::sync::Arc;

use async_trait::async_trait;
use bp_core::store::DocumentStore;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{decode_args, require_text, Tool, ToolContext, ToolError, ToolName};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanArgs {
    plan_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPlansArgs {
    brand_id: String,
}

/// Fetch a content plan
pub struct GetPlanTool {
    store: Arc<dyn DocumentStore>,
}

impl GetPlanTool {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetPlanTool {
    fn name(&self) -> ToolName {
        ToolName::GetPlan
    }

    async fn execute(&self, _ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        let args: PlanArgs = decode_args(args)?;
        let plan_id = require_text(&args.plan_id, "planId")?;

        let plan = self
            .store
            .get_plan(&plan_id)
            .await?
            .ok_or_else(|| ToolError::NotFound(format!("Plan {}", plan_id)))?;

        serde_json::to_value(plan).map_err(|e| ToolError::Store(e.to_string()))
    }
}

/// List the plans of a brand
pub struct ListPlansTool {
    store: Arc<dyn DocumentStore>,
}

impl ListPlansTool {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListPlansTool {
    fn name(&self) -> ToolName {
        ToolName::ListPlans
    }

    async fn execute(&self, _ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        let args: ListPlansArgs = decode_args(args)?;
        let brand_id = require_text(&args.brand_id, "brandId")?;

        let plans = self.store.list_plans(&brand_id).await?;
        Ok(json!({
            "brandId": brand_id,
            "count": plans.len(),
            "plans": plans,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::seeded_store;

    fn ctx() -> ToolContext {
        ToolContext {
            run_id: "run_test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_get_plan_returns_topics() {
        let (store, _temp) = seeded_store().await;
        let tool = GetPlanTool::new(store);

        let plan = tool.execute(&ctx(), json!({"planId": "plan1"})).await.unwrap();
        assert_eq!(plan["brandId"], "brand1");
        assert_eq!(plan["topics"][0], "Autumn blend launch");
    }

    #[tokio::test]
    async fn test_get_missing_plan() {
        let (store, _temp) = seeded_store().await;
        let tool = GetPlanTool::new(store);

        let err = tool
            .execute(&ctx(), json!({"planId": "missing"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_plans_for_brand() {
        let (store, _temp) = seeded_store().await;
        let tool = ListPlansTool::new(store);

        let listed = tool
            .execute(&ctx(), json!({"brandId": "brand1"}))
            .await
            .unwrap();
        assert_eq!(listed["count"], 1);
        assert_eq!(listed["plans"][0]["id"], "plan1");

        let empty = tool
            .execute(&ctx(), json!({"brandId": "brand2"}))
            .await
            .unwrap();
        assert_eq!(empty["count"], 0);
    }
}
