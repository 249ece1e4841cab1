//! Calendar collaborator contract: free/busy lookup and tentative event
//! creation. No iCal or transport specifics leak into the pipeline.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CalendarError;
use crate::pipeline::types::EventDraft;

/// A busy interval on the calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BusyInterval {
    /// Whether this interval overlaps `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && start < self.end
    }
}

/// Calendar read/write operations the pipeline consumes.
#[async_trait]
pub trait CalendarClient: Send + Sync {
    /// Busy intervals overlapping `[start, end)`.
    async fn free_busy(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>, CalendarError>;

    /// Register a tentative event; returns the event id.
    async fn create_draft_event(&self, event: &EventDraft) -> Result<String, CalendarError>;
}
