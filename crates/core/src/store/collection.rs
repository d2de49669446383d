//! JSON-file backed document collection

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::brand::Brand;
use crate::plan::Plan;
use crate::post::Post;
use crate::{Error, Result};

/// A record stored in a [`JsonCollection`]
pub(crate) trait Document: Clone + Serialize + DeserializeOwned + Send + Sync {
    fn id(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
    fn touch(&mut self);
}

impl Document for Brand {
    fn id(&self) -> &str {
        &self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Document for Plan {
    fn id(&self) -> &str {
        &self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Document for Post {
    fn id(&self) -> &str {
        &self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// In-memory cache of documents, persisted as a JSON array on every write.
///
/// If the file doesn't exist, it will be created on first write.
pub(crate) struct JsonCollection<T> {
    path: PathBuf,
    cache: RwLock<HashMap<String, T>>,
}

impl<T: Document> JsonCollection<T> {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let cache = if tokio::fs::try_exists(&path).await? {
            let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
                Error::Storage(format!("Failed to read {}: {}", path.display(), e))
            })?;
            let docs: Vec<T> = serde_json::from_str(&content).map_err(|e| {
                Error::Storage(format!("Failed to parse {}: {}", path.display(), e))
            })?;
            docs.into_iter().map(|d| (d.id().to_string(), d)).collect()
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            cache: RwLock::new(cache),
        })
    }

    pub async fn get(&self, id: &str) -> Option<T> {
        let cache = self.cache.read().await;
        cache.get(id).cloned()
    }

    /// Matching documents, newest first
    pub async fn filter<F>(&self, predicate: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        let cache = self.cache.read().await;
        let mut docs: Vec<T> = cache.values().filter(|d| predicate(d)).cloned().collect();
        docs.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        docs
    }

    pub async fn upsert(&self, mut doc: T) -> Result<T> {
        doc.touch();
        {
            let mut cache = self.cache.write().await;
            cache.insert(doc.id().to_string(), doc.clone());
        }
        self.persist().await?;
        Ok(doc)
    }

    /// Insert a document whose ID must not exist yet
    pub async fn insert(&self, doc: T) -> Result<T> {
        {
            let mut cache = self.cache.write().await;
            if cache.contains_key(doc.id()) {
                return Err(Error::InvalidInput(format!(
                    "Document with ID {} already exists",
                    doc.id()
                )));
            }
            cache.insert(doc.id().to_string(), doc.clone());
        }
        self.persist().await?;
        Ok(doc)
    }

    /// Replace a document that must already exist; `None` when it doesn't
    pub async fn replace(&self, mut doc: T) -> Result<Option<T>> {
        doc.touch();
        {
            let mut cache = self.cache.write().await;
            if !cache.contains_key(doc.id()) {
                return Ok(None);
            }
            cache.insert(doc.id().to_string(), doc.clone());
        }
        self.persist().await?;
        Ok(Some(doc))
    }

    async fn persist(&self) -> Result<()> {
        let cache = self.cache.read().await;
        let docs: Vec<&T> = cache.values().collect();
        let content = serde_json::to_string_pretty(&docs)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&self.path, content).await.map_err(|e| {
            Error::Storage(format!("Failed to write {}: {}", self.path.display(), e))
        })?;
        Ok(())
    }
}
