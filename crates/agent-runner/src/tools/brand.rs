use std::sync::Arc;

use async_trait::async_trait;
use bp_core::store::DocumentStore;
use serde::Deserialize;
use serde_json::Value;

use super::{decode_args, require_text, Tool, ToolContext, ToolError, ToolName};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BrandArgs {
    brand_id: String,
}

/// Fetch a brand profile
pub struct GetBrandTool {
    store: Arc<dyn DocumentStore>,
}

impl GetBrandTool {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetBrandTool {
    fn name(&self) -> ToolName {
        ToolName::GetBrand
    }

    async fn execute(&self, _ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        let args: BrandArgs = decode_args(args)?;
        let brand_id = require_text(&args.brand_id, "brandId")?;

        let brand = self
            .store
            .get_brand(&brand_id)
            .await?
            .ok_or_else(|| ToolError::NotFound(format!("Brand {}", brand_id)))?;

        serde_json::to_value(brand).map_err(|e| ToolError::Store(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::seeded_store;
    use serde_json::json;

    fn ctx() -> ToolContext {
        ToolContext {
            run_id: "run_test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_get_brand() {
        let (store, _temp) = seeded_store().await;
        let tool = GetBrandTool::new(store);

        let brand = tool
            .execute(&ctx(), json!({"brandId": "brand1"}))
            .await
            .unwrap();
        assert_eq!(brand["id"], "brand1");
        assert_eq!(brand["name"], "Acme Coffee");
    }

    #[tokio::test]
    async fn test_get_missing_brand() {
        let (store, _temp) = seeded_store().await;
        let tool = GetBrandTool::new(store);

        let err = tool
            .execute(&ctx(), json!({"brandId": "nope"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_get_brand_requires_id() {
        let (store, _temp) = seeded_store().await;
        let tool = GetBrandTool::new(store);

        let err = tool.execute(&ctx(), json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
