//! Application state

use std::sync::Arc;

use agent_runner::{AssistantsClient, Orchestrator, OrchestratorError, Planner, ToolRegistry};
use bp_core::store::{DocumentStore, FileDocumentStore};

use crate::config::AppConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    store: Arc<dyn DocumentStore>,
    tools: ToolRegistry,
    orchestrator: Result<Orchestrator, String>,
}

impl AppState {
    /// Create state backed by the file store and the configured planner.
    ///
    /// A planner that cannot be configured does not prevent start-up; the
    /// problem is reported when an orchestration is requested.
    pub async fn new(config: AppConfig) -> bp_core::Result<Self> {
        let store: Arc<dyn DocumentStore> = Arc::new(FileDocumentStore::new(&config.data_dir).await?);
        let tools = ToolRegistry::with_defaults(store.clone());

        let planner = AssistantsClient::new(config.planner_config(tools.function_definitions()))
            .map(|client| Arc::new(client) as Arc<dyn Planner>);
        if let Err(e) = &planner {
            tracing::warn!("Planner unavailable: {}", e);
        }

        let planner = planner.map_err(|e| match e {
            OrchestratorError::NotConfigured(reason) => reason,
            other => other.to_string(),
        });
        Ok(Self::build(config, store, tools, planner))
    }

    /// Create state over explicit collaborators
    pub fn with_planner(
        config: AppConfig,
        store: Arc<dyn DocumentStore>,
        planner: Arc<dyn Planner>,
    ) -> Self {
        let tools = ToolRegistry::with_defaults(store.clone());
        Self::build(config, store, tools, Ok(planner))
    }

    fn build(
        config: AppConfig,
        store: Arc<dyn DocumentStore>,
        tools: ToolRegistry,
        planner: Result<Arc<dyn Planner>, String>,
    ) -> Self {
        let orchestrator = planner.map(|planner| {
            Orchestrator::new(
                planner,
                store.clone(),
                tools.clone(),
                config.orchestrator_config(),
            )
        });

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                tools,
                orchestrator,
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.inner.store.as_ref()
    }

    pub fn store_arc(&self) -> Arc<dyn DocumentStore> {
        Arc::clone(&self.inner.store)
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.inner.tools
    }

    pub fn planner_configured(&self) -> bool {
        self.inner.orchestrator.is_ok()
    }

    pub fn orchestrator(&self) -> Result<&Orchestrator, OrchestratorError> {
        self.inner
            .orchestrator
            .as_ref()
            .map_err(|reason| OrchestratorError::NotConfigured(reason.clone()))
    }
}
