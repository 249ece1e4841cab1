//! Meeting responder — calendar-aware scheduling reply.
//!
//! No NLP extraction of the requested meeting shape: the responder proposes
//! a fixed-duration meeting over the next few days, computes free slots by
//! subtracting busy intervals from working hours, and builds a tentative
//! event for the earliest free slot. Calendar failures abort (a scheduling
//! reply without availability would be wrong), generation failures abort
//! like every other variant.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::clients::calendar::CalendarClient;
use crate::clients::generation::{CompletionRequest, GenerationService};
use crate::config::MeetingConfig;
use crate::error::{CalendarError, RespondError};
use crate::pipeline::types::{
    Category, Classification, DraftPayload, EventDraft, NormalizedEmail, ResponseDraft, TimeSlot,
};
use crate::responders::template::{display_name, ReplyTemplate, REFERENCE_PREFIX};
use crate::responders::Responder;

const MAX_TOKENS: u32 = 500;
const TEMPERATURE: f32 = 0.5;

pub struct MeetingResponder {
    calendar: Arc<dyn CalendarClient>,
    generator: Arc<dyn GenerationService>,
    template: ReplyTemplate,
    config: MeetingConfig,
    calendar_timeout: Duration,
}

impl MeetingResponder {
    pub fn new(
        calendar: Arc<dyn CalendarClient>,
        generator: Arc<dyn GenerationService>,
        template: ReplyTemplate,
        config: MeetingConfig,
        calendar_timeout: Duration,
    ) -> Self {
        Self {
            calendar,
            generator,
            template,
            config,
            calendar_timeout,
        }
    }

    /// Free slots across the candidate days, earliest first, capped at
    /// `max_slots` total.
    async fn available_slots(&self, anchor: DateTime<Utc>) -> Result<Vec<TimeSlot>, CalendarError> {
        let duration = chrono::Duration::minutes(self.config.duration_minutes);
        let mut slots = Vec::new();

        for offset in 1..=self.config.candidate_days {
            let date = (anchor + chrono::Duration::days(offset)).date_naive();
            let (Some(day_start), Some(day_end)) = (
                date.and_hms_opt(self.config.work_start_hour, 0, 0),
                date.and_hms_opt(self.config.work_end_hour, 0, 0),
            ) else {
                continue;
            };
            let day_start = day_start.and_utc();
            let day_end = day_end.and_utc();

            let busy = match tokio::time::timeout(
                self.calendar_timeout,
                self.calendar.free_busy(day_start, day_end),
            )
            .await
            {
                Ok(result) => result?,
                Err(_) => {
                    return Err(CalendarError::Timeout { timeout: self.calendar_timeout });
                }
            };

            let mut start = day_start;
            while start + duration <= day_end && slots.len() < self.config.max_slots {
                let end = start + duration;
                if !busy.iter().any(|b| b.overlaps(start, end)) {
                    slots.push(TimeSlot { start, end });
                }
                start = end;
            }

            if slots.len() >= self.config.max_slots {
                break;
            }
        }

        debug!(count = slots.len(), "Computed free meeting slots");
        Ok(slots)
    }
}

#[async_trait]
impl Responder for MeetingResponder {
    fn category(&self) -> Category {
        Category::Meeting
    }

    async fn generate(
        &self,
        email: &NormalizedEmail,
        _classification: &Classification,
    ) -> Result<ResponseDraft, RespondError> {
        let slots = self
            .available_slots(email.message.received_at)
            .await
            .map_err(RespondError::Calendar)?;

        let event = slots.first().map(|slot| EventDraft {
            summary: format!("Meeting with {}", display_name(&email.message.sender)),
            start: slot.start,
            end: slot.end,
            attendees: vec![email.message.sender.clone()],
        });

        let prompt = build_prompt(email, &slots);
        let content = self
            .generator
            .complete(
                CompletionRequest::new(prompt)
                    .with_max_tokens(MAX_TOKENS)
                    .with_temperature(TEMPERATURE),
            )
            .await?;

        let slots_section = format_slots(&slots);
        let content_with_slots = if slots.is_empty() {
            content
        } else {
            format!("{content}\n\n{slots_section}")
        };

        let reference = event
            .as_ref()
            .map(|e| format!("{REFERENCE_PREFIX} tentative hold for {}", format_slot_time(e.start)));

        let body = self.template.render(
            &email.message.sender,
            &content_with_slots,
            reference.as_deref(),
        );

        Ok(ResponseDraft {
            body,
            kind: Category::Meeting,
            payload: DraftPayload::Meeting { slots, event },
            created_at: Utc::now(),
        })
    }
}

fn format_slot_time(t: DateTime<Utc>) -> String {
    t.format("%A, %B %-d at %H:%M UTC").to_string()
}

fn format_slots(slots: &[TimeSlot]) -> String {
    slots
        .iter()
        .map(|s| format!("- {}", format_slot_time(s.start)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn build_prompt(email: &NormalizedEmail, slots: &[TimeSlot]) -> String {
    let slots_text = if slots.is_empty() {
        "(no free slots in the next few days)".to_string()
    } else {
        format_slots(slots)
    };

    format!(
        "Generate a reply to a meeting request.\n\n\
         Request:\n{}\n\n\
         My available time slots:\n{}\n\n\
         Requirements:\n\
         - Thank the sender for the request\n\
         - Ask which of the listed times works for them\n\
         - If no slots are listed, apologize and ask for dates further out\n\
         - Keep it brief and professional",
        email.cleaned_body, slots_text
    )
}
