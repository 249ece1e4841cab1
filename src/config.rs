//! Configuration types.

use std::time::Duration;

use crate::retry::RetryPolicy;

/// Pipeline configuration.
///
/// Everything the orchestrator needs to bound, gate, and pace the pipeline.
/// Thresholds follow the operational defaults of the hosted deployment:
/// drafts below `min_confidence` are flagged, drafts at or above
/// `auto_approve_threshold` can skip human review.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Character budget for text sent to the classification service.
    /// Truncation happens before the request is built.
    pub classify_char_budget: usize,
    /// Below this category confidence the draft is flagged for review
    /// with a warning.
    pub min_confidence: f32,
    /// At or above this category confidence the draft is auto-approvable.
    pub auto_approve_threshold: f32,
    /// Timeout for one classification call.
    pub classification_timeout: Duration,
    /// Timeout for one generation call.
    pub generation_timeout: Duration,
    /// Timeout for one calendar call (free/busy or event creation).
    pub calendar_timeout: Duration,
    /// Timeout for knowledge-base and conversation-history lookups.
    pub lookup_timeout: Duration,
    /// Timeout for draft creation in the mailbox.
    pub publish_timeout: Duration,
    /// Timeout for the record-store write.
    pub persist_timeout: Duration,
    /// Maximum pipeline invocations in the external-call section at once.
    /// The rate-limit hook toward quota-limited collaborators.
    pub max_inflight_external: usize,
    /// Retry policy for transient classification failures.
    pub classify_retry: RetryPolicy,
    /// Retry policy for transient generation failures.
    pub generation_retry: RetryPolicy,
    /// Signature block appended to every rendered reply.
    pub signature: String,
    /// Meeting-specific defaults.
    pub meeting: MeetingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            classify_char_budget: 2000,
            min_confidence: 0.75,
            auto_approve_threshold: 0.95,
            classification_timeout: Duration::from_secs(10),
            generation_timeout: Duration::from_secs(30),
            calendar_timeout: Duration::from_secs(10),
            lookup_timeout: Duration::from_secs(5),
            publish_timeout: Duration::from_secs(10),
            persist_timeout: Duration::from_secs(10),
            max_inflight_external: 8,
            classify_retry: RetryPolicy::default(),
            generation_retry: RetryPolicy::default(),
            signature: "Best regards,\nThe Acme Team".to_string(),
            meeting: MeetingConfig::default(),
        }
    }
}

/// Defaults for the meeting responder.
///
/// There is no NLP extraction of meeting shape from the email body — the
/// responder proposes slots for a fixed duration over the next few days.
#[derive(Debug, Clone)]
pub struct MeetingConfig {
    /// Proposed meeting length in minutes.
    pub duration_minutes: i64,
    /// How many days after arrival to consider as candidate dates.
    pub candidate_days: i64,
    /// Maximum number of slots offered across all candidate days.
    pub max_slots: usize,
    /// Working-hours window (UTC, whole hours).
    pub work_start_hour: u32,
    pub work_end_hour: u32,
}

impl Default for MeetingConfig {
    fn default() -> Self {
        Self {
            duration_minutes: 60,
            candidate_days: 5,
            max_slots: 5,
            work_start_hour: 9,
            work_end_hour: 17,
        }
    }
}
