//! Error types for mail-pilot.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Pipeline stage, recorded on every failure result.
///
/// `Routing` cannot currently fail (dispatch is an exhaustive match over the
/// closed category set) but stays in the taxonomy so stored failure records
/// keep a stable shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Intake,
    Classification,
    Routing,
    Generation,
    Publishing,
    Persistence,
}

impl Stage {
    /// Short label for logging and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Intake => "intake",
            Self::Classification => "classification",
            Self::Routing => "routing",
            Self::Generation => "generation",
            Self::Publishing => "publishing",
            Self::Persistence => "persistence",
        }
    }
}

/// Intake errors — the message could not be turned into a `NormalizedEmail`.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("message could not be parsed: {0}")]
    Malformed(String),

    #[error("no decodable text part in message")]
    NoTextPart,

    #[error("invalid sender address: {0}")]
    InvalidSender(String),
}

/// Classification service errors.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("classification service unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("classification timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("invalid distribution from classification service: {reason}")]
    InvalidResponse { reason: String },
}

impl ClassifyError {
    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }
}

/// Generation service errors.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("generation service unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("generation timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("generation service returned an empty completion")]
    EmptyCompletion,
}

impl GenerateError {
    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }
}

/// Calendar collaborator errors.
#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("calendar unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("calendar call timed out after {timeout:?}")]
    Timeout { timeout: Duration },
}

/// Knowledge-base collaborator errors.
///
/// These never abort the pipeline — the support responder degrades to an
/// empty article list.
#[derive(Debug, thiserror::Error)]
pub enum KbError {
    #[error("knowledge base unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Conversation-history collaborator errors.
///
/// Same degradation policy as [`KbError`].
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("conversation history unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Mail-transport errors (draft creation).
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail transport unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("draft creation timed out after {timeout:?}")]
    Timeout { timeout: Duration },
}

/// Record-store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store connection failed: {0}")]
    Connection(String),

    #[error("record write failed: {0}")]
    Write(String),

    #[error("record write timed out after {timeout:?}")]
    Timeout { timeout: Duration },
}

/// Responder errors — generation is mandatory, calendar lookups are too.
///
/// KB and history failures are handled inside the responder and never
/// surface here.
#[derive(Debug, thiserror::Error)]
pub enum RespondError {
    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error("calendar lookup failed: {0}")]
    Calendar(#[from] CalendarError),
}

/// The underlying cause carried by a `ProcessingResult::Failure`.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("intake failed: {0}")]
    Intake(#[from] IntakeError),

    #[error("classification failed: {0}")]
    Classification(#[from] ClassifyError),

    #[error("generation failed: {0}")]
    Generation(#[from] GenerateError),

    #[error("calendar lookup failed: {0}")]
    Calendar(#[from] CalendarError),

    #[error("draft publish failed: {0}")]
    Publish(#[from] MailError),

    #[error("persistence failed: {0}")]
    Persistence(#[from] StoreError),
}

impl From<RespondError> for PipelineError {
    fn from(e: RespondError) -> Self {
        match e {
            RespondError::Generate(e) => Self::Generation(e),
            RespondError::Calendar(e) => Self::Calendar(e),
        }
    }
}
