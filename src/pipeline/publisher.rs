//! Draft publisher — puts the rendered reply into the mailbox.
//!
//! Creates a draft threaded to the original message. Meeting drafts that
//! carry an event payload also get a tentative calendar hold; a failure
//! there degrades (the mail draft already exists and must not be lost),
//! while a mail-transport failure is a Publishing-stage failure.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::clients::calendar::CalendarClient;
use crate::clients::mail::MailTransport;
use crate::error::MailError;
use crate::pipeline::types::{DraftPayload, ResponseDraft};

/// Result of publishing one draft.
#[derive(Debug, Clone)]
pub struct PublishedDraft {
    /// Opaque mailbox draft id.
    pub draft_id: String,
    /// Tentative calendar event id, for meeting drafts whose hold was
    /// registered.
    pub event_id: Option<String>,
}

pub struct DraftPublisher {
    mail: Arc<dyn MailTransport>,
    calendar: Arc<dyn CalendarClient>,
    publish_timeout: Duration,
    calendar_timeout: Duration,
}

impl DraftPublisher {
    pub fn new(
        mail: Arc<dyn MailTransport>,
        calendar: Arc<dyn CalendarClient>,
        publish_timeout: Duration,
        calendar_timeout: Duration,
    ) -> Self {
        Self {
            mail,
            calendar,
            publish_timeout,
            calendar_timeout,
        }
    }

    /// Publish a draft threaded to `thread_id`.
    pub async fn publish(
        &self,
        draft: &ResponseDraft,
        thread_id: &str,
    ) -> Result<PublishedDraft, MailError> {
        let draft_id = match tokio::time::timeout(
            self.publish_timeout,
            self.mail.create_draft(thread_id, &draft.body),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => return Err(MailError::Timeout { timeout: self.publish_timeout }),
        };

        let event_id = if let DraftPayload::Meeting { event: Some(event), .. } = &draft.payload {
            match tokio::time::timeout(
                self.calendar_timeout,
                self.calendar.create_draft_event(event),
            )
            .await
            {
                Ok(Ok(id)) => Some(id),
                Ok(Err(e)) => {
                    warn!(error = %e, "Tentative event creation failed, mail draft kept");
                    None
                }
                Err(_) => {
                    warn!("Tentative event creation timed out, mail draft kept");
                    None
                }
            }
        } else {
            None
        };

        info!(draft_id = %draft_id, event_id = ?event_id, "Draft published");
        Ok(PublishedDraft { draft_id, event_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use crate::clients::calendar::BusyInterval;
    use crate::clients::fixtures::{RecordingMailbox, StaticCalendar};
    use crate::error::CalendarError;
    use crate::pipeline::types::{Category, EventDraft, TimeSlot};

    fn inquiry_draft() -> ResponseDraft {
        ResponseDraft {
            body: "Dear Bob,\n\nHi.\n\nBest".into(),
            kind: Category::Inquiry,
            payload: DraftPayload::None,
            created_at: Utc::now(),
        }
    }

    fn meeting_draft() -> ResponseDraft {
        let start = Utc.with_ymd_and_hms(2025, 8, 6, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 8, 6, 10, 0, 0).unwrap();
        ResponseDraft {
            body: "Dear Bob,\n\nTimes below.\n\nBest".into(),
            kind: Category::Meeting,
            payload: DraftPayload::Meeting {
                slots: vec![TimeSlot { start, end }],
                event: Some(EventDraft {
                    summary: "Meeting with Bob".into(),
                    start,
                    end,
                    attendees: vec!["bob@example.com".into()],
                }),
            },
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn publishes_threaded_draft() {
        let mailbox = Arc::new(RecordingMailbox::new());
        let publisher = DraftPublisher::new(
            mailbox.clone(),
            Arc::new(StaticCalendar::new(vec![])),
            Duration::from_secs(1),
            Duration::from_secs(1),
        );

        let published = publisher.publish(&inquiry_draft(), "thread-1").await.unwrap();
        assert!(published.event_id.is_none());

        let drafts = mailbox.drafts();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].thread_id, "thread-1");
        assert_eq!(drafts[0].draft_id, published.draft_id);
    }

    #[tokio::test]
    async fn meeting_draft_registers_tentative_event() {
        let calendar = Arc::new(StaticCalendar::new(vec![]));
        let publisher = DraftPublisher::new(
            Arc::new(RecordingMailbox::new()),
            calendar.clone(),
            Duration::from_secs(1),
            Duration::from_secs(1),
        );

        let published = publisher.publish(&meeting_draft(), "thread-2").await.unwrap();
        assert!(published.event_id.is_some());
        assert_eq!(calendar.created_events().len(), 1);
        assert_eq!(calendar.created_events()[0].summary, "Meeting with Bob");
    }

    struct DownCalendar;

    #[async_trait]
    impl CalendarClient for DownCalendar {
        async fn free_busy(
            &self,
            _start: chrono::DateTime<Utc>,
            _end: chrono::DateTime<Utc>,
        ) -> Result<Vec<BusyInterval>, CalendarError> {
            Err(CalendarError::Unavailable { reason: "down".into() })
        }

        async fn create_draft_event(&self, _event: &EventDraft) -> Result<String, CalendarError> {
            Err(CalendarError::Unavailable { reason: "down".into() })
        }
    }

    #[tokio::test]
    async fn calendar_failure_keeps_mail_draft() {
        let mailbox = Arc::new(RecordingMailbox::new());
        let publisher = DraftPublisher::new(
            mailbox.clone(),
            Arc::new(DownCalendar),
            Duration::from_secs(1),
            Duration::from_secs(1),
        );

        let published = publisher.publish(&meeting_draft(), "thread-3").await.unwrap();
        assert!(published.event_id.is_none());
        assert_eq!(mailbox.drafts().len(), 1);
    }

    struct DownMailbox;

    #[async_trait]
    impl MailTransport for DownMailbox {
        async fn create_draft(&self, _thread_id: &str, _body: &str) -> Result<String, MailError> {
            Err(MailError::Unavailable { reason: "imap down".into() })
        }
    }

    #[tokio::test]
    async fn transport_failure_is_surfaced() {
        let publisher = DraftPublisher::new(
            Arc::new(DownMailbox),
            Arc::new(StaticCalendar::new(vec![])),
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        let err = publisher.publish(&inquiry_draft(), "thread-4").await.unwrap_err();
        assert!(matches!(err, MailError::Unavailable { .. }));
    }
}
