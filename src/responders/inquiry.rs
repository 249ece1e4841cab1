//! Inquiry responder — direct reply from subject and body, no external
//! context lookup.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::clients::generation::{CompletionRequest, GenerationService};
use crate::error::RespondError;
use crate::pipeline::types::{
    Category, Classification, DraftPayload, NormalizedEmail, ResponseDraft,
};
use crate::responders::template::ReplyTemplate;
use crate::responders::Responder;

const MAX_TOKENS: u32 = 500;
const TEMPERATURE: f32 = 0.7;

pub struct InquiryResponder {
    generator: Arc<dyn GenerationService>,
    template: ReplyTemplate,
}

impl InquiryResponder {
    pub fn new(generator: Arc<dyn GenerationService>, template: ReplyTemplate) -> Self {
        Self { generator, template }
    }
}

#[async_trait]
impl Responder for InquiryResponder {
    fn category(&self) -> Category {
        Category::Inquiry
    }

    async fn generate(
        &self,
        email: &NormalizedEmail,
        _classification: &Classification,
    ) -> Result<ResponseDraft, RespondError> {
        let prompt = build_prompt(email);
        let content = self
            .generator
            .complete(
                CompletionRequest::new(prompt)
                    .with_max_tokens(MAX_TOKENS)
                    .with_temperature(TEMPERATURE),
            )
            .await?;

        let body = self.template.render(&email.message.sender, &content, None);
        Ok(ResponseDraft {
            body,
            kind: Category::Inquiry,
            payload: DraftPayload::None,
            created_at: Utc::now(),
        })
    }
}

fn build_prompt(email: &NormalizedEmail) -> String {
    format!(
        "Generate a professional response to the following inquiry:\n\n\
         Subject: {}\n\
         Content: {}\n\n\
         Requirements:\n\
         - Be professional and courteous\n\
         - Address all points in the inquiry\n\
         - Provide clear next steps if applicable\n\
         - Keep the tone friendly but professional",
        email.message.subject, email.cleaned_body
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::clients::fixtures::CannedGenerator;
    use crate::pipeline::types::{ExtractedEntities, InboundMessage, Priority};

    fn email() -> NormalizedEmail {
        NormalizedEmail {
            message: InboundMessage {
                message_id: "m-1".into(),
                sender: "prospect@example.com".into(),
                recipients: vec!["sales@acme.test".into()],
                subject: "Product inquiry".into(),
                body: "I would like to know more about your enterprise plan.".into(),
                received_at: Utc::now(),
                attachments: vec![],
            },
            cleaned_body: "I would like to know more about your enterprise plan.".into(),
            entities: ExtractedEntities::default(),
        }
    }

    fn classification() -> Classification {
        Classification {
            category: Category::Inquiry,
            category_confidence: 0.9,
            priority: Priority::Medium,
            priority_confidence: 0.5,
            distribution: vec![],
        }
    }

    #[test]
    fn prompt_contains_subject_and_body() {
        let prompt = build_prompt(&email());
        assert!(prompt.contains("Product inquiry"));
        assert!(prompt.contains("enterprise plan"));
    }

    #[tokio::test]
    async fn generates_templated_draft_with_no_payload() {
        let responder = InquiryResponder::new(
            Arc::new(CannedGenerator),
            ReplyTemplate::new("Best regards,\nAcme"),
        );
        let draft = responder.generate(&email(), &classification()).await.unwrap();

        assert_eq!(draft.kind, Category::Inquiry);
        assert!(matches!(draft.payload, DraftPayload::None));
        assert!(draft.body.starts_with("Dear Prospect,"));
        assert!(draft.body.ends_with("Best regards,\nAcme"));
    }
}
