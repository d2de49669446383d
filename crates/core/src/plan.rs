//! Content plan model definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A content plan: an ordered list of topics to post about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: String,
    pub brand_id: String,
    pub title: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Plan {
    /// Create a new plan for a brand
    pub fn new(brand_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            brand_id: brand_id.into(),
            title: title.into(),
            topics: Vec::new(),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the ID
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the topics
    pub fn with_topics(mut self, topics: Vec<String>) -> Self {
        self.topics = topics;
        self
    }

    /// Set the notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// First non-blank topic, used when the planner omits one
    pub fn first_topic(&self) -> Option<&str> {
        self.topics
            .iter()
            .map(|t| t.trim())
            .find(|t| !t.is_empty())
    }
}

/// Request body for creating or replacing a plan
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertPlanRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub brand_id: String,
    pub title: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl From<UpsertPlanRequest> for Plan {
    fn from(req: UpsertPlanRequest) -> Self {
        let mut plan = Plan::new(req.brand_id, req.title).with_topics(req.topics);
        if let Some(id) = req.id {
            plan = plan.with_id(id);
        }
        plan.notes = req.notes;
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_topic_skips_blank_entries() {
        let plan = Plan::new("brand1", "Spring").with_topics(vec![
            "  ".to_string(),
            " launch day ".to_string(),
            "recap".to_string(),
        ]);

        assert_eq!(plan.first_topic(), Some("launch day"));
    }

    #[test]
    fn test_first_topic_empty_plan() {
        let plan = Plan::new("brand1", "Empty");
        assert_eq!(plan.first_topic(), None);
    }
}
