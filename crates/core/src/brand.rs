//! Brand model definitions
//!
//! A Brand is the publishing identity content is produced for.
//! Plans and posts belong to brands.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::post::normalize_hashtags;

/// A brand document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tone-of-voice guidance handed to the planner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    /// Hashtags attached to every post of this brand
    #[serde(default)]
    pub hashtags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Brand {
    /// Create a new brand with a generated ID
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: None,
            voice: None,
            audience: None,
            hashtags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the ID
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the tone of voice
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    /// Set the audience
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Set the default hashtags
    pub fn with_hashtags(mut self, hashtags: Vec<String>) -> Self {
        self.hashtags = hashtags;
        self
    }
}

/// Request body for creating or replacing a brand
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertBrandRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
    #[serde(default)]
    pub hashtags: Vec<String>,
}

impl From<UpsertBrandRequest> for Brand {
    fn from(req: UpsertBrandRequest) -> Self {
        let mut brand = Brand::new(req.name).with_hashtags(normalize_hashtags(req.hashtags));
        if let Some(id) = req.id {
            brand = brand.with_id(id);
        }
        brand.description = req.description;
        brand.voice = req.voice;
        brand.audience = req.audience;
        brand
    }
}
