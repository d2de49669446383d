use std::sync::Arc;

use async_trait::async_trait;
use bp_core::post::{normalize_hashtags, Post, PostStatus};
use bp_core::store::DocumentStore;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{decode_args, optional_text, require_text, Tool, ToolContext, ToolError, ToolName};

/// Default number of posts returned by `list_posts`
pub const DEFAULT_POST_LIMIT: usize = 10;
const MAX_POST_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPostsArgs {
    brand_id: String,
    #[serde(default)]
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostCopyArgs {
    brand_id: String,
    #[serde(default)]
    plan_id: Option<String>,
    #[serde(default)]
    topic: Option<String>,
    content: String,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    hashtags: Vec<String>,
    #[serde(default)]
    status: Option<PostStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdatePostArgs {
    post_id: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    hashtags: Option<Vec<String>>,
    #[serde(default)]
    status: Option<PostStatus>,
}

/// Draft copy prepared by `generate_post_copy`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct PostCopy {
    brand_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    plan_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    topic: Option<String>,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
    hashtags: Vec<String>,
}

/// List recent posts of a brand
pub struct ListPostsTool {
    store: Arc<dyn DocumentStore>,
}

impl ListPostsTool {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListPostsTool {
    fn name(&self) -> ToolName {
        ToolName::ListPosts
    }

    async fn execute(&self, _ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        let args: ListPostsArgs = decode_args(args)?;
        let brand_id = require_text(&args.brand_id, "brandId")?;
        let limit = args
            .limit
            .map(|l| l.clamp(1, MAX_POST_LIMIT as i64) as usize)
            .unwrap_or(DEFAULT_POST_LIMIT);

        let posts = self.store.list_posts(&brand_id, limit).await?;
        Ok(json!({
            "brandId": brand_id,
            "count": posts.len(),
            "posts": posts,
        }))
    }
}

/// Prepare post copy without writing anything
pub struct GeneratePostCopyTool {
    store: Arc<dyn DocumentStore>,
}

impl GeneratePostCopyTool {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GeneratePostCopyTool {
    fn name(&self) -> ToolName {
        ToolName::GeneratePostCopy
    }

    async fn execute(&self, _ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        let args: PostCopyArgs = decode_args(args)?;
        let brand_id = require_text(&args.brand_id, "brandId")?;
        let content = require_text(&args.content, "content")?;

        let brand = self
            .store
            .get_brand(&brand_id)
            .await?
            .ok_or_else(|| ToolError::NotFound(format!("Brand {}", brand_id)))?;

        let hashtags = normalize_hashtags(args.hashtags.iter().chain(brand.hashtags.iter()));

        let copy = PostCopy {
            brand_id,
            plan_id: optional_text(args.plan_id),
            topic: optional_text(args.topic),
            content,
            comment: optional_text(args.comment),
            hashtags,
        };

        Ok(json!({ "postCopy": copy }))
    }
}

/// Publish a post
pub struct CreatePostTool {
    store: Arc<dyn DocumentStore>,
}

impl CreatePostTool {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CreatePostTool {
    fn name(&self) -> ToolName {
        ToolName::CreatePost
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        let args: PostCopyArgs = decode_args(args)?;
        let brand_id = require_text(&args.brand_id, "brandId")?;
        let content = require_text(&args.content, "content")?;

        if self.store.get_brand(&brand_id).await?.is_none() {
            return Err(ToolError::NotFound(format!("Brand {}", brand_id)));
        }

        let mut post = Post::new(brand_id, content)
            .with_hashtags(args.hashtags)
            .with_status(args.status.unwrap_or_default())
            .with_run_id(ctx.run_id.clone());
        if let Some(plan_id) = optional_text(args.plan_id) {
            post = post.with_plan_id(plan_id);
        }
        if let Some(topic) = optional_text(args.topic) {
            post = post.with_topic(topic);
        }
        if let Some(comment) = optional_text(args.comment) {
            post = post.with_comment(comment);
        }

        let post = self.store.create_post(post).await?;
        tracing::info!(post_id = %post.id, brand_id = %post.brand_id, "Created post");

        serde_json::to_value(post).map_err(|e| ToolError::Store(e.to_string()))
    }
}

/// Mutate an existing post
pub struct UpdatePostTool {
    store: Arc<dyn DocumentStore>,
}

impl UpdatePostTool {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for UpdatePostTool {
    fn name(&self) -> ToolName {
        ToolName::UpdatePost
    }

    async fn execute(&self, _ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        let args: UpdatePostArgs = decode_args(args)?;
        let post_id = require_text(&args.post_id, "postId")?;

        let mut post = self
            .store
            .get_post(&post_id)
            .await?
            .ok_or_else(|| ToolError::NotFound(format!("Post {}", post_id)))?;

        if let Some(content) = args.content {
            post.content = require_text(&content, "content")?;
        }
        if let Some(comment) = args.comment {
            post.comment = optional_text(Some(comment));
        }
        if let Some(hashtags) = args.hashtags {
            post.hashtags = normalize_hashtags(hashtags);
        }
        if let Some(status) = args.status {
            post.status = status;
        }

        let post = self.store.update_post(post).await?;
        serde_json::to_value(post).map_err(|e| ToolError::Store(e.to_string()))
    }
}
