//! Category-specific response generation.
//!
//! One responder per category, all behind the same `Responder` trait. Each
//! variant gathers its own context (knowledge-base hits, calendar slots,
//! conversation history), builds a prompt, calls the generation service,
//! and renders the completion into the shared reply template.

pub mod follow_up;
pub mod inquiry;
pub mod meeting;
pub mod support;
pub mod template;

use async_trait::async_trait;

pub use follow_up::FollowUpResponder;
pub use inquiry::InquiryResponder;
pub use meeting::MeetingResponder;
pub use support::SupportResponder;
pub use template::ReplyTemplate;

use crate::error::RespondError;
use crate::pipeline::types::{Category, Classification, NormalizedEmail, ResponseDraft};

/// A category-specific draft generator.
#[async_trait]
pub trait Responder: Send + Sync {
    /// The category this responder handles.
    fn category(&self) -> Category;

    /// Produce a draft reply for a classified email.
    ///
    /// Generation-service and calendar failures abort; knowledge-base and
    /// history lookups degrade to empty results inside the responder.
    async fn generate(
        &self,
        email: &NormalizedEmail,
        classification: &Classification,
    ) -> Result<ResponseDraft, RespondError>;
}
