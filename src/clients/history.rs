//! Conversation-history collaborator contract.
//!
//! Backed by a similarity-searchable message store. Same degradation policy
//! as the knowledge base: lookup failures become an empty history.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::HistoryError;

/// One prior message exchanged with a sender.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PastMessage {
    pub sender: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

/// A page of conversation history, newest message first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryPage {
    pub conversation_id: Option<String>,
    pub messages: Vec<PastMessage>,
}

/// Conversation-history retrieval.
#[async_trait]
pub trait ConversationHistory: Send + Sync {
    /// Up to `limit` most recent messages exchanged with `sender`,
    /// newest first.
    async fn recent_for_sender(
        &self,
        sender: &str,
        limit: usize,
    ) -> Result<HistoryPage, HistoryError>;
}
