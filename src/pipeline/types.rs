//! Shared types for the email processing pipeline.
//!
//! Everything here is created and consumed within a single pipeline
//! invocation and never mutated after construction. Only the record store
//! extends lifetimes beyond the call, by writing durable copies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Stage};

// ── Raw input ───────────────────────────────────────────────────────

/// A raw message as handed over by the mail transport: undecoded bytes plus
/// the transport metadata the parser cannot supply itself.
#[derive(Debug, Clone)]
pub struct RawMessage {
    /// Transport-native message id, also used as the reply thread id.
    pub message_id: String,
    /// When the transport received the message.
    pub received_at: DateTime<Utc>,
    /// Full RFC 822 message bytes.
    pub raw: Vec<u8>,
}

// ── Inbound message ─────────────────────────────────────────────────

/// Attachment metadata. Contents are never loaded into the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub size: usize,
}

/// Structured view of one inbound email. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Transport-native message id.
    pub message_id: String,
    /// Sender address.
    pub sender: String,
    /// Recipient addresses.
    pub recipients: Vec<String>,
    /// Subject line, `(no subject)` when the header is missing.
    pub subject: String,
    /// Raw body text as extracted from the message, before cleaning.
    pub body: String,
    /// When the transport received the message.
    pub received_at: DateTime<Utc>,
    /// Attachment metadata.
    pub attachments: Vec<Attachment>,
}

/// Entities extracted from the cleaned body, in first-occurrence order with
/// duplicates preserved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedEntities {
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub urls: Vec<String>,
}

/// An inbound message after intake: cleaned body plus extracted entities.
/// Read-only for every downstream stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedEmail {
    pub message: InboundMessage,
    /// Body with signature, quoted replies, and whitespace runs removed.
    pub cleaned_body: String,
    pub entities: ExtractedEntities,
}

// ── Classification ──────────────────────────────────────────────────

/// Closed set of email intents. Every category has exactly one responder;
/// dispatch is an exhaustive match, so adding a variant fails compilation
/// until a responder exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Inquiry,
    Support,
    Meeting,
    FollowUp,
}

impl Category {
    /// All categories, in canonical order.
    pub const ALL: [Category; 4] = [
        Category::Inquiry,
        Category::Support,
        Category::Meeting,
        Category::FollowUp,
    ];

    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Inquiry => "inquiry",
            Self::Support => "support",
            Self::Meeting => "meeting",
            Self::FollowUp => "follow_up",
        }
    }
}

/// Urgency levels, least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// Rank for urgency comparisons; higher is more urgent.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
            Self::Urgent => 3,
        }
    }

    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

/// Outcome of classification and priority scoring.
///
/// Both confidences are always in `[0, 1]` — a neutral 0.5 is used when no
/// signal fires, never NaN, so threshold comparisons downstream are always
/// well-formed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub category: Category,
    pub category_confidence: f32,
    pub priority: Priority,
    pub priority_confidence: f32,
    /// Full per-category probability list from the classification service.
    pub distribution: Vec<(Category, f32)>,
}

// ── Response draft ──────────────────────────────────────────────────

/// A proposed meeting time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A tentative calendar event, built for the earliest offered slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    pub summary: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub attendees: Vec<String>,
}

/// Category-specific structured payload attached to a draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DraftPayload {
    /// No structured payload (inquiry replies).
    None,
    /// Support reply with its synthesized ticket id.
    Support { ticket_id: String },
    /// Meeting reply with offered slots and the tentative event, if any
    /// slot was free.
    Meeting {
        slots: Vec<TimeSlot>,
        event: Option<EventDraft>,
    },
    /// Follow-up reply linked to a prior conversation, when one was found.
    FollowUp { conversation_id: Option<String> },
}

/// A generated reply, produced exactly once per successfully routed message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseDraft {
    /// Fully rendered reply body (greeting, content, reference, signature).
    pub body: String,
    /// Mirrors the category that produced this draft.
    pub kind: Category,
    pub payload: DraftPayload,
    pub created_at: DateTime<Utc>,
}

// ── Pipeline result ─────────────────────────────────────────────────

/// Review gate for a generated draft, decided from category confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Confidence high enough that the draft could be sent unreviewed.
    AutoApprove,
    /// A human should look at the draft before it goes out.
    NeedsReview,
}

/// Outcome of one pipeline invocation. The caller never sees a raised
/// error — every failure is folded into the `Failure` variant with the
/// stage that produced it.
#[derive(Debug)]
pub enum ProcessingResult {
    Success {
        classification: Classification,
        draft: ResponseDraft,
        /// Mailbox draft id from the publisher.
        draft_id: String,
        disposition: Disposition,
    },
    Failure {
        stage: Stage,
        error: PipelineError,
        /// Draft generated before the failing stage, if one exists.
        /// Publish and persistence failures keep the draft so nothing
        /// the generator produced is lost.
        draft: Option<ResponseDraft>,
    },
}

impl ProcessingResult {
    /// Failure with no draft to salvage.
    pub fn failure(stage: Stage, error: impl Into<PipelineError>) -> Self {
        Self::Failure {
            stage,
            error: error.into(),
            draft: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Stage of the failure, if this is one.
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            Self::Failure { stage, .. } => Some(*stage),
            Self::Success { .. } => None,
        }
    }
}
