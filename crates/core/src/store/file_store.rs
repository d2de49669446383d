//! File-based document store implementation
//!
//! Brands, plans and posts are kept as JSON arrays in one file each;
//! traces are appended to a JSON lines log.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::collection::JsonCollection;
use super::trace_log::TraceLog;
use super::DocumentStore;
use crate::brand::Brand;
use crate::plan::Plan;
use crate::post::Post;
use crate::trace::TraceEnvelope;
use crate::{Error, Result};

/// File-based document store rooted at a data directory
pub struct FileDocumentStore {
    data_dir: PathBuf,
    brands: JsonCollection<Brand>,
    plans: JsonCollection<Plan>,
    posts: JsonCollection<Post>,
    traces: TraceLog,
}

impl FileDocumentStore {
    /// Open (or lazily create) the store under `data_dir`
    pub async fn new(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();

        let brands = JsonCollection::open(data_dir.join("brands.json")).await?;
        let plans = JsonCollection::open(data_dir.join("plans.json")).await?;
        let posts = JsonCollection::open(data_dir.join("posts.json")).await?;
        let traces = TraceLog::open(data_dir.join("traces.jsonl")).await?;

        debug!("Opened document store at {}", data_dir.display());
        Ok(Self {
            data_dir,
            brands,
            plans,
            posts,
            traces,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn get_brand(&self, id: &str) -> Result<Option<Brand>> {
        Ok(self.brands.get(id).await)
    }

    async fn upsert_brand(&self, brand: Brand) -> Result<Brand> {
        if brand.id.trim().is_empty() {
            return Err(Error::InvalidInput("Brand ID must not be empty".into()));
        }
        self.brands.upsert(brand).await
    }

    async fn get_plan(&self, id: &str) -> Result<Option<Plan>> {
        Ok(self.plans.get(id).await)
    }

    async fn list_plans(&self, brand_id: &str) -> Result<Vec<Plan>> {
        Ok(self.plans.filter(|p| p.brand_id == brand_id).await)
    }

    async fn upsert_plan(&self, plan: Plan) -> Result<Plan> {
        if plan.id.trim().is_empty() {
            return Err(Error::InvalidInput("Plan ID must not be empty".into()));
        }
        self.plans.upsert(plan).await
    }

    async fn get_post(&self, id: &str) -> Result<Option<Post>> {
        Ok(self.posts.get(id).await)
    }

    async fn create_post(&self, post: Post) -> Result<Post> {
        self.posts.insert(post).await
    }

    async fn update_post(&self, post: Post) -> Result<Post> {
        let id = post.id.clone();
        self.posts
            .replace(post)
            .await?
            .ok_or(Error::PostNotFound(id))
    }

    async fn list_posts(&self, brand_id: &str, limit: usize) -> Result<Vec<Post>> {
        let mut posts = self.posts.filter(|p| p.brand_id == brand_id).await;
        posts.truncate(limit);
        Ok(posts)
    }

    async fn append_trace(&self, envelope: TraceEnvelope) -> Result<()> {
        self.traces.append(envelope).await
    }

    async fn get_trace(&self, run_id: &str) -> Result<Option<TraceEnvelope>> {
        Ok(self.traces.latest_for_run(run_id).await)
    }

    async fn list_traces(&self, limit: usize) -> Result<Vec<TraceEnvelope>> {
        Ok(self.traces.recent(limit).await)
    }
}
