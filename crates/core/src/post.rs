//! Content post model definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Publication status of a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Draft,
    Published,
}

impl Default for PostStatus {
    fn default() -> Self {
        Self::Published
    }
}

/// A content post document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub brand_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub status: PostStatus,
    /// Agent run that produced this post
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Create a new post for a brand
    pub fn new(brand_id: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            brand_id: brand_id.into(),
            plan_id: None,
            topic: None,
            content: content.into(),
            comment: None,
            hashtags: Vec::new(),
            status: PostStatus::default(),
            run_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the ID
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the plan id
    pub fn with_plan_id(mut self, plan_id: impl Into<String>) -> Self {
        self.plan_id = Some(plan_id.into());
        self
    }

    /// Set the topic
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Set the comment
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Set the hashtags (normalized)
    pub fn with_hashtags(mut self, hashtags: Vec<String>) -> Self {
        self.hashtags = normalize_hashtags(hashtags);
        self
    }

    /// Set the status
    pub fn with_status(mut self, status: PostStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the producing run
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }
}

/// Normalize hashtags: trim, ensure a single leading `#`, drop blanks and
/// case-insensitive duplicates while keeping first-seen order.
pub fn normalize_hashtags<I, S>(hashtags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();

    for raw in hashtags {
        let tag = raw.as_ref().trim().trim_start_matches('#').trim();
        if tag.is_empty() || tag.contains(char::is_whitespace) {
            continue;
        }
        if seen.insert(tag.to_lowercase()) {
            out.push(format!("#{}", tag));
        }
    }

    out
}
