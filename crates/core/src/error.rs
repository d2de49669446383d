//! Error types for the core library

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Brand not found: {0}")]
    BrandNotFound(String),

    #[error("Plan not found: {0}")]
    PlanNotFound(String),

    #[error("Post not found: {0}")]
    PostNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Whether the error describes a missing document
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::BrandNotFound(_) | Self::PlanNotFound(_) | Self::PostNotFound(_)
        )
    }
}
