//! Support responder — knowledge-base-assisted reply with a synthesized
//! ticket id.
//!
//! The KB lookup is an enrichment: on failure or timeout the responder
//! proceeds with an empty article list and logs a warning. This is the one
//! place (together with follow-up history) where a collaborator failure is
//! swallowed instead of aborting the pipeline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use crate::clients::generation::{CompletionRequest, GenerationService};
use crate::clients::knowledge::{Article, KnowledgeBase};
use crate::error::RespondError;
use crate::pipeline::types::{
    Category, Classification, DraftPayload, NormalizedEmail, ResponseDraft,
};
use crate::responders::template::{ReplyTemplate, REFERENCE_PREFIX};
use crate::responders::Responder;

/// At most this many articles feed the prompt.
const MAX_ARTICLES: usize = 3;
/// Articles below this relevance are not worth citing.
const MIN_RELEVANCE: f32 = 0.7;
const MAX_TOKENS: u32 = 800;
const TEMPERATURE: f32 = 0.5;

pub struct SupportResponder {
    knowledge: Arc<dyn KnowledgeBase>,
    generator: Arc<dyn GenerationService>,
    template: ReplyTemplate,
    lookup_timeout: Duration,
}

impl SupportResponder {
    pub fn new(
        knowledge: Arc<dyn KnowledgeBase>,
        generator: Arc<dyn GenerationService>,
        template: ReplyTemplate,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            knowledge,
            generator,
            template,
            lookup_timeout,
        }
    }

    /// KB search with the degraded-fallback policy: any failure becomes an
    /// empty article list.
    async fn search_articles(&self, query: &str) -> Vec<Article> {
        match tokio::time::timeout(
            self.lookup_timeout,
            self.knowledge.search(query, MAX_ARTICLES, MIN_RELEVANCE),
        )
        .await
        {
            Ok(Ok(articles)) => articles,
            Ok(Err(e)) => {
                warn!(error = %e, "Knowledge base search failed, continuing without articles");
                Vec::new()
            }
            Err(_) => {
                warn!("Knowledge base search timed out, continuing without articles");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl Responder for SupportResponder {
    fn category(&self) -> Category {
        Category::Support
    }

    async fn generate(
        &self,
        email: &NormalizedEmail,
        _classification: &Classification,
    ) -> Result<ResponseDraft, RespondError> {
        let articles = self.search_articles(&email.cleaned_body).await;
        let ticket_id = new_ticket_id();

        let prompt = build_prompt(email, &articles, &ticket_id);
        let content = self
            .generator
            .complete(
                CompletionRequest::new(prompt)
                    .with_max_tokens(MAX_TOKENS)
                    .with_temperature(TEMPERATURE),
            )
            .await?;

        let reference = format!("{REFERENCE_PREFIX} support ticket {ticket_id}");
        let body = self
            .template
            .render(&email.message.sender, &content, Some(&reference));

        Ok(ResponseDraft {
            body,
            kind: Category::Support,
            payload: DraftPayload::Support { ticket_id },
            created_at: Utc::now(),
        })
    }
}

/// Ticket ids are timestamped with a short random suffix so two tickets in
/// the same second stay distinct.
fn new_ticket_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("TKT-{}-{}", Utc::now().format("%Y%m%d%H%M%S"), &suffix[..6])
}

fn build_prompt(email: &NormalizedEmail, articles: &[Article], ticket_id: &str) -> String {
    let mut kb_section = String::new();
    if articles.is_empty() {
        kb_section.push_str("(no relevant articles found)");
    } else {
        for (i, article) in articles.iter().enumerate() {
            kb_section.push_str(&format!(
                "Article {}: {} — {}\n",
                i + 1,
                article.title,
                article.content
            ));
        }
    }

    format!(
        "Generate a technical support response:\n\n\
         Customer issue:\n{}\n\n\
         Relevant knowledge base articles:\n{}\n\n\
         Requirements:\n\
         - Provide clear step-by-step solutions\n\
         - Reference relevant documentation\n\
         - Include troubleshooting steps\n\
         - Maintain professional tone\n\
         - The ticket reference number is {}",
        email.cleaned_body, kb_section, ticket_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::clients::fixtures::{CannedGenerator, StaticKnowledgeBase};
    use crate::error::KbError;
    use crate::pipeline::types::{ExtractedEntities, InboundMessage, Priority};

    fn email() -> NormalizedEmail {
        NormalizedEmail {
            message: InboundMessage {
                message_id: "m-2".into(),
                sender: "user@example.com".into(),
                recipients: vec!["helpdesk@acme.test".into()],
                subject: "Cannot login to account".into(),
                body: "Hi, I have been trying to login but keep getting errors.".into(),
                received_at: Utc::now(),
                attachments: vec![],
            },
            cleaned_body: "Hi, I have been trying to login but keep getting errors.".into(),
            entities: ExtractedEntities::default(),
        }
    }

    fn classification() -> Classification {
        Classification {
            category: Category::Support,
            category_confidence: 0.85,
            priority: Priority::High,
            priority_confidence: 0.6,
            distribution: vec![],
        }
    }

    fn articles() -> Vec<Article> {
        vec![Article {
            id: "kb-1".into(),
            title: "Resetting your password".into(),
            content: "Use the reset link on the sign-in page.".into(),
            relevance: 0.92,
        }]
    }

    #[tokio::test]
    async fn draft_carries_ticket_id_in_body_and_payload() {
        let responder = SupportResponder::new(
            Arc::new(StaticKnowledgeBase::new(articles())),
            Arc::new(CannedGenerator),
            ReplyTemplate::new("Best regards,\nAcme Support"),
            Duration::from_secs(1),
        );
        let draft = responder.generate(&email(), &classification()).await.unwrap();

        let DraftPayload::Support { ticket_id } = &draft.payload else {
            panic!("expected support payload, got {:?}", draft.payload);
        };
        assert!(ticket_id.starts_with("TKT-"));
        assert!(draft.body.contains(ticket_id.as_str()));
        assert_eq!(draft.kind, Category::Support);
    }

    struct FailingKb;

    #[async_trait]
    impl KnowledgeBase for FailingKb {
        async fn search(
            &self,
            _query: &str,
            _limit: usize,
            _min_relevance: f32,
        ) -> Result<Vec<Article>, KbError> {
            Err(KbError::Unavailable { reason: "index offline".into() })
        }
    }

    #[tokio::test]
    async fn kb_failure_degrades_to_empty_article_list() {
        let responder = SupportResponder::new(
            Arc::new(FailingKb),
            Arc::new(CannedGenerator),
            ReplyTemplate::new("Best regards,\nAcme Support"),
            Duration::from_secs(1),
        );
        // Must still produce a draft
        let draft = responder.generate(&email(), &classification()).await.unwrap();
        assert!(draft.body.contains("TKT-"));
    }

    struct HungKb;

    #[async_trait]
    impl KnowledgeBase for HungKb {
        async fn search(
            &self,
            _query: &str,
            _limit: usize,
            _min_relevance: f32,
        ) -> Result<Vec<Article>, KbError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn kb_timeout_degrades_to_empty_article_list() {
        let responder = SupportResponder::new(
            Arc::new(HungKb),
            Arc::new(CannedGenerator),
            ReplyTemplate::new("Best regards,\nAcme Support"),
            Duration::from_millis(10),
        );
        let draft = responder.generate(&email(), &classification()).await.unwrap();
        assert!(matches!(draft.payload, DraftPayload::Support { .. }));
    }

    #[test]
    fn prompt_lists_articles_and_ticket() {
        let prompt = build_prompt(&email(), &articles(), "TKT-20250805120000-abc123");
        assert!(prompt.contains("Resetting your password"));
        assert!(prompt.contains("TKT-20250805120000-abc123"));
        assert!(prompt.contains("step-by-step"));
    }

    #[test]
    fn ticket_ids_are_unique() {
        assert_ne!(new_ticket_id(), new_ticket_id());
    }
}
