//! Mail-transport collaborator contract: draft creation only.
//!
//! Pure I/O seam — parsing inbound mail lives in intake, and nothing is
//! ever sent automatically; drafts wait in the mailbox for review.

use async_trait::async_trait;

use crate::error::MailError;

/// Mailbox draft operations the pipeline consumes.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Create an unsent draft reply threaded to `thread_id`; returns an
    /// opaque draft id.
    async fn create_draft(&self, thread_id: &str, body: &str) -> Result<String, MailError>;
}
