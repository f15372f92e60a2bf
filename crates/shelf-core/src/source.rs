//! Content source collaborator

use async_trait::async_trait;
use shelf_schema::{ContentCategory, ContentRecord};

/// Retrieval failure for one category.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Content source failed for {category}: {message}")]
pub struct SourceError {
    pub category: ContentCategory,
    pub message: String,
}

impl SourceError {
    pub fn new(category: ContentCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }
}

/// Produces the finite list of catalog items for a user and category.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch(
        &self,
        user: &str,
        category: ContentCategory,
        limit: Option<usize>,
    ) -> Result<Vec<ContentRecord>, SourceError>;
}
