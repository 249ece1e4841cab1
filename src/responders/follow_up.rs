//! Follow-up responder — continues an existing conversation.
//!
//! Pulls the most recent messages exchanged with the sender from the
//! history store before prompting; if the lookup fails the reply is
//! generated without context (same degradation policy as the support
//! responder's knowledge base).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::warn;

use crate::clients::generation::{CompletionRequest, GenerationService};
use crate::clients::history::{ConversationHistory, HistoryPage};
use crate::error::RespondError;
use crate::pipeline::types::{
    Category, Classification, DraftPayload, NormalizedEmail, ResponseDraft,
};
use crate::responders::template::{ReplyTemplate, REFERENCE_PREFIX};
use crate::responders::Responder;

/// How many prior messages feed the prompt.
const MAX_HISTORY: usize = 5;
const MAX_TOKENS: u32 = 600;
const TEMPERATURE: f32 = 0.7;

pub struct FollowUpResponder {
    history: Arc<dyn ConversationHistory>,
    generator: Arc<dyn GenerationService>,
    template: ReplyTemplate,
    lookup_timeout: Duration,
}

impl FollowUpResponder {
    pub fn new(
        history: Arc<dyn ConversationHistory>,
        generator: Arc<dyn GenerationService>,
        template: ReplyTemplate,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            history,
            generator,
            template,
            lookup_timeout,
        }
    }

    /// History lookup with the degraded-fallback policy.
    async fn recent_history(&self, sender: &str) -> HistoryPage {
        match tokio::time::timeout(
            self.lookup_timeout,
            self.history.recent_for_sender(sender, MAX_HISTORY),
        )
        .await
        {
            Ok(Ok(page)) => page,
            Ok(Err(e)) => {
                warn!(error = %e, "History lookup failed, continuing without context");
                HistoryPage::default()
            }
            Err(_) => {
                warn!("History lookup timed out, continuing without context");
                HistoryPage::default()
            }
        }
    }
}

#[async_trait]
impl Responder for FollowUpResponder {
    fn category(&self) -> Category {
        Category::FollowUp
    }

    async fn generate(
        &self,
        email: &NormalizedEmail,
        _classification: &Classification,
    ) -> Result<ResponseDraft, RespondError> {
        let history = self.recent_history(&email.message.sender).await;

        let prompt = build_prompt(email, &history);
        let content = self
            .generator
            .complete(
                CompletionRequest::new(prompt)
                    .with_max_tokens(MAX_TOKENS)
                    .with_temperature(TEMPERATURE),
            )
            .await?;

        // Newest message first — cite it so the reader knows which thread
        // this continues.
        let reference = history.messages.first().map(|m| {
            format!(
                "{REFERENCE_PREFIX} our conversation on {}",
                m.sent_at.format("%B %-d, %Y")
            )
        });

        let body = self
            .template
            .render(&email.message.sender, &content, reference.as_deref());

        Ok(ResponseDraft {
            body,
            kind: Category::FollowUp,
            payload: DraftPayload::FollowUp {
                conversation_id: history.conversation_id,
            },
            created_at: Utc::now(),
        })
    }
}

fn build_prompt(email: &NormalizedEmail, history: &HistoryPage) -> String {
    let mut context = String::new();
    if history.messages.is_empty() {
        context.push_str("(no prior conversation found)");
    } else {
        for (i, message) in history.messages.iter().enumerate() {
            context.push_str(&format!("Message {}: {}\n", i + 1, message.content));
        }
    }

    format!(
        "Generate a personalized follow-up email response:\n\n\
         Original email:\n{}\n\n\
         Conversation history (newest first):\n{}\n\n\
         Requirements:\n\
         - Reference previous interactions\n\
         - Maintain conversation context\n\
         - Be proactive about next steps\n\
         - Address any outstanding items",
        email.cleaned_body, context
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    use crate::clients::fixtures::{CannedGenerator, StaticHistory};
    use crate::clients::history::PastMessage;
    use crate::error::HistoryError;
    use crate::pipeline::types::{ExtractedEntities, InboundMessage, Priority};

    fn email() -> NormalizedEmail {
        NormalizedEmail {
            message: InboundMessage {
                message_id: "m-4".into(),
                sender: "client@example.com".into(),
                recipients: vec!["me@acme.test".into()],
                subject: "Following up".into(),
                body: "Just following up on the proposal from last week.".into(),
                received_at: Utc::now(),
                attachments: vec![],
            },
            cleaned_body: "Just following up on the proposal from last week.".into(),
            entities: ExtractedEntities::default(),
        }
    }

    fn classification() -> Classification {
        Classification {
            category: Category::FollowUp,
            category_confidence: 0.8,
            priority: Priority::Medium,
            priority_confidence: 0.5,
            distribution: vec![],
        }
    }

    fn history_with_messages() -> StaticHistory {
        let page = HistoryPage {
            conversation_id: Some("conv-42".into()),
            messages: vec![PastMessage {
                sender: "client@example.com".into(),
                content: "Here is the proposal we discussed.".into(),
                sent_at: Utc.with_ymd_and_hms(2025, 7, 29, 10, 0, 0).unwrap(),
            }],
        };
        StaticHistory::new(HashMap::from([("client@example.com".to_string(), page)]))
    }

    #[tokio::test]
    async fn draft_references_prior_conversation() {
        let responder = FollowUpResponder::new(
            Arc::new(history_with_messages()),
            Arc::new(CannedGenerator),
            ReplyTemplate::new("Best regards,\nAcme"),
            Duration::from_secs(1),
        );
        let draft = responder.generate(&email(), &classification()).await.unwrap();

        assert!(draft.body.contains("Ref: our conversation on July 29, 2025"));
        let DraftPayload::FollowUp { conversation_id } = &draft.payload else {
            panic!("expected follow-up payload");
        };
        assert_eq!(conversation_id.as_deref(), Some("conv-42"));
    }

    struct FailingHistory;

    #[async_trait]
    impl ConversationHistory for FailingHistory {
        async fn recent_for_sender(
            &self,
            _sender: &str,
            _limit: usize,
        ) -> Result<HistoryPage, HistoryError> {
            Err(HistoryError::Unavailable { reason: "store offline".into() })
        }
    }

    #[tokio::test]
    async fn history_failure_degrades_to_empty_context() {
        let responder = FollowUpResponder::new(
            Arc::new(FailingHistory),
            Arc::new(CannedGenerator),
            ReplyTemplate::new("Best regards,\nAcme"),
            Duration::from_secs(1),
        );
        let draft = responder.generate(&email(), &classification()).await.unwrap();

        let DraftPayload::FollowUp { conversation_id } = &draft.payload else {
            panic!("expected follow-up payload");
        };
        assert!(conversation_id.is_none());
        // No reference line without history
        assert!(!draft.body.contains("Ref:"));
    }

    #[tokio::test]
    async fn unknown_sender_gets_contextless_follow_up() {
        let responder = FollowUpResponder::new(
            Arc::new(StaticHistory::empty()),
            Arc::new(CannedGenerator),
            ReplyTemplate::new("Best regards,\nAcme"),
            Duration::from_secs(1),
        );
        let draft = responder.generate(&email(), &classification()).await.unwrap();
        assert!(matches!(
            draft.payload,
            DraftPayload::FollowUp { conversation_id: None }
        ));
    }

    #[test]
    fn prompt_numbers_history_messages() {
        let page = HistoryPage {
            conversation_id: None,
            messages: vec![
                PastMessage {
                    sender: "c@x.test".into(),
                    content: "newest".into(),
                    sent_at: Utc::now(),
                },
                PastMessage {
                    sender: "c@x.test".into(),
                    content: "older".into(),
                    sent_at: Utc::now(),
                },
            ],
        };
        let prompt = build_prompt(&email(), &page);
        assert!(prompt.contains("Message 1: newest"));
        assert!(prompt.contains("Message 2: older"));
        assert!(prompt.contains("follow-up"));
    }
}
