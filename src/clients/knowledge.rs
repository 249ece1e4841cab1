//! Knowledge-base collaborator contract.
//!
//! KB search is an enrichment, not a hard dependency — the support
//! responder proceeds with an empty article list when it fails.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::KbError;

/// A ranked knowledge-base article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub content: String,
    /// Similarity score in `[0, 1]`.
    pub relevance: f32,
}

/// Similarity-searchable article store.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Up to `limit` articles relevant to `query`, best first, filtered to
    /// `relevance >= min_relevance`.
    async fn search(
        &self,
        query: &str,
        limit: usize,
        min_relevance: f32,
    ) -> Result<Vec<Article>, KbError>;
}
