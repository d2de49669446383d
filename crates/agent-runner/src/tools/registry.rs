//! Tool registry keyed by [`ToolName`]

use std::collections::BTreeMap;
use std::sync::Arc;

use bp_core::store::DocumentStore;
use serde_json::Value;

use super::{
    CreatePostTool, GeneratePostCopyTool, GetBrandTool, GetPlanTool, ListPlansTool,
    ListPostsTool, Tool, ToolContext, ToolError, ToolName, ToolRef, ToolSchema, UpdatePostTool,
};

/// Registered tools, dispatched by name
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<ToolName, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every known tool over one store
    pub fn with_defaults(store: Arc<dyn DocumentStore>) -> Self {
        let mut registry = Self::new();
        registry.register(GetBrandTool::new(store.clone()));
        registry.register(GetPlanTool::new(store.clone()));
        registry.register(ListPlansTool::new(store.clone()));
        registry.register(ListPostsTool::new(store.clone()));
        registry.register(GeneratePostCopyTool::new(store.clone()));
        registry.register(CreatePostTool::new(store.clone()));
        registry.register(UpdatePostTool::new(store));
        registry
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.tools.insert(tool.name(), Arc::new(tool));
    }

    pub fn get(&self, name: ToolName) -> Option<Arc<dyn Tool>> {
        self.tools.get(&name).cloned()
    }

    pub fn contains(&self, name: ToolName) -> bool {
        self.tools.contains_key(&name)
    }

    pub fn tool_names(&self) -> Vec<ToolName> {
        self.tools.keys().copied().collect()
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|tool| tool.schema()).collect()
    }

    /// Function definitions to hand to the planner
    pub fn function_definitions(&self) -> Vec<Value> {
        self.schemas()
            .iter()
            .map(ToolSchema::function_definition)
            .collect()
    }

    /// Execute the tool referenced by `tool`
    pub async fn dispatch(
        &self,
        tool: &ToolRef,
        ctx: &ToolContext,
        args: Value,
    ) -> Result<Value, ToolError> {
        let handler = tool
            .known()
            .and_then(|name| self.get(name))
            .ok_or_else(|| ToolError::UnknownTool(tool.as_str().to_string()))?;

        handler.execute(ctx, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::seeded_store;
    use serde_json::json;

    #[tokio::test]
    async fn test_defaults_cover_every_tool() {
        let (store, _temp) = seeded_store().await;
        let registry = ToolRegistry::with_defaults(store);

        assert_eq!(registry.tool_names(), ToolName::ALL.to_vec());
        assert_eq!(registry.function_definitions().len(), ToolName::ALL.len());
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool() {
        let (store, _temp) = seeded_store().await;
        let registry = ToolRegistry::with_defaults(store);
        let ctx = ToolContext {
            run_id: "run_test".to_string(),
        };

        let err = registry
            .dispatch(&ToolRef::resolve("launch_rocket"), &ctx, json!({}))
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::UnknownTool("launch_rocket".to_string()));
    }

    #[tokio::test]
    async fn test_dispatch_unregistered_known_tool() {
        let registry = ToolRegistry::new();
        let ctx = ToolContext {
            run_id: "run_test".to_string(),
        };

        let err = registry
            .dispatch(&ToolRef::Known(ToolName::GetBrand), &ctx, json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(_)));
    }
}
