//! Document storage
//!
//! Defines the interface for brand, plan, post and trace persistence.

mod collection;
mod file_store;
mod trace_log;

use async_trait::async_trait;

use crate::brand::Brand;
use crate::plan::Plan;
use crate::post::Post;
use crate::trace::TraceEnvelope;
use crate::Result;

pub use file_store::FileDocumentStore;

/// Repository interface over the document kinds the agent tools touch
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Get a brand by ID
    async fn get_brand(&self, id: &str) -> Result<Option<Brand>>;

    /// Create or replace a brand
    async fn upsert_brand(&self, brand: Brand) -> Result<Brand>;

    /// Get a plan by ID
    async fn get_plan(&self, id: &str) -> Result<Option<Plan>>;

    /// Plans of a brand, newest first
    async fn list_plans(&self, brand_id: &str) -> Result<Vec<Plan>>;

    /// Create or replace a plan
    async fn upsert_plan(&self, plan: Plan) -> Result<Plan>;

    /// Get a post by ID
    async fn get_post(&self, id: &str) -> Result<Option<Post>>;

    /// Create a new post
    async fn create_post(&self, post: Post) -> Result<Post>;

    /// Update an existing post
    async fn update_post(&self, post: Post) -> Result<Post>;

    /// Posts of a brand, newest first, at most `limit`
    async fn list_posts(&self, brand_id: &str, limit: usize) -> Result<Vec<Post>>;

    /// Append a finalized trace
    async fn append_trace(&self, envelope: TraceEnvelope) -> Result<()>;

    /// Latest stored trace for a run
    async fn get_trace(&self, run_id: &str) -> Result<Option<TraceEnvelope>>;

    /// Most recent traces, newest first
    async fn list_traces(&self, limit: usize) -> Result<Vec<TraceEnvelope>>;
}
