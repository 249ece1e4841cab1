//! `RecordStore` trait — durable records for processed emails and their
//! generated responses.
//!
//! One email record and one linked response record per successfully
//! published draft, written as a single unit of work. By design this runs
//! after publishing: a failed write leaves the draft in the mailbox, and
//! the pipeline surfaces that state to the caller instead of unwinding.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::pipeline::types::{Category, DraftPayload, Priority};

/// Durable record of one processed email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailRecord {
    pub message_id: String,
    pub sender: String,
    pub subject: String,
    /// Cleaned body, as classified.
    pub body: String,
    pub category: Category,
    pub category_confidence: f32,
    pub priority: Priority,
    pub priority_confidence: f32,
    pub received_at: DateTime<Utc>,
    pub processed_at: DateTime<Utc>,
}

/// Durable record of the generated response, linked to its email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRecord {
    /// Mailbox draft id from the publisher.
    pub draft_id: String,
    /// Fully rendered reply body.
    pub body: String,
    pub kind: Category,
    pub payload: DraftPayload,
    /// Which generation model produced the content.
    pub model_version: String,
    pub generated_at: DateTime<Utc>,
}

/// Persistence operations the pipeline consumes.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Write both records atomically: either both exist afterwards or
    /// neither does.
    async fn write_email_and_response(
        &self,
        email: &EmailRecord,
        response: &ResponseRecord,
    ) -> Result<(), StoreError>;
}
