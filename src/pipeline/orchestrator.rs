//! Orchestrator — owns the stage sequencing and the per-stage
//! continue/abort decisions.
//!
//! Flow for one message:
//! 1. Intake normalization (parse, clean, extract entities)
//! 2. Classification (external, retried) + priority scoring (local)
//! 3. Routing to the category's responder
//! 4. Response generation (responder gathers context, calls the generator)
//! 5. Draft publishing (mailbox draft, tentative event for meetings)
//! 6. Persistence (email + response records, one transaction)
//!
//! A failure at any stage short-circuits the rest and yields a structured
//! `ProcessingResult::Failure` — the caller never sees a raised error.
//! Publish and persistence failures still hand back the generated draft.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::clients::calendar::CalendarClient;
use crate::clients::classification::ClassificationService;
use crate::clients::generation::{GenerationService, RetryingGenerator};
use crate::clients::history::ConversationHistory;
use crate::clients::knowledge::KnowledgeBase;
use crate::clients::mail::MailTransport;
use crate::config::PipelineConfig;
use crate::error::{ClassifyError, Stage, StoreError};
use crate::pipeline::classifier::{classification_text, ClassifierClient};
use crate::pipeline::intake::IntakeNormalizer;
use crate::pipeline::priority::PriorityScorer;
use crate::pipeline::publisher::DraftPublisher;
use crate::pipeline::router::Router;
use crate::pipeline::types::{
    Classification, Disposition, ProcessingResult, RawMessage,
};
use crate::responders::{
    FollowUpResponder, InquiryResponder, MeetingResponder, ReplyTemplate, SupportResponder,
};
use crate::retry;
use crate::store::traits::{EmailRecord, RecordStore, ResponseRecord};

/// Already-constructed collaborator handles. The orchestrator never builds
/// clients itself and never reaches into process-wide state.
pub struct Collaborators {
    pub classifier: Arc<dyn ClassificationService>,
    pub generator: Arc<dyn GenerationService>,
    pub calendar: Arc<dyn CalendarClient>,
    pub knowledge: Arc<dyn KnowledgeBase>,
    pub history: Arc<dyn ConversationHistory>,
    pub mail: Arc<dyn MailTransport>,
    pub store: Arc<dyn RecordStore>,
}

/// The pipeline entry point. Cheap to share behind `Arc`; invocations for
/// different messages are independent and may run concurrently.
pub struct Orchestrator {
    intake: IntakeNormalizer,
    classifier: ClassifierClient,
    priority: PriorityScorer,
    router: Router,
    publisher: DraftPublisher,
    store: Arc<dyn RecordStore>,
    generator: Arc<dyn GenerationService>,
    limiter: Arc<Semaphore>,
    config: PipelineConfig,
}

impl Orchestrator {
    pub fn new(collaborators: Collaborators, config: PipelineConfig) -> Self {
        // One shared retry/timeout wrapper so every responder sees the same
        // generation policy.
        let generator: Arc<dyn GenerationService> = Arc::new(RetryingGenerator::new(
            collaborators.generator,
            config.generation_retry.clone(),
            config.generation_timeout,
        ));

        let template = ReplyTemplate::new(config.signature.clone());
        let router = Router::new(
            InquiryResponder::new(generator.clone(), template.clone()),
            SupportResponder::new(
                collaborators.knowledge,
                generator.clone(),
                template.clone(),
                config.lookup_timeout,
            ),
            MeetingResponder::new(
                collaborators.calendar.clone(),
                generator.clone(),
                template.clone(),
                config.meeting.clone(),
                config.calendar_timeout,
            ),
            FollowUpResponder::new(
                collaborators.history,
                generator.clone(),
                template,
                config.lookup_timeout,
            ),
        );

        let classifier = ClassifierClient::new(
            collaborators.classifier,
            config.classify_char_budget,
            config.classification_timeout,
        );

        let publisher = DraftPublisher::new(
            collaborators.mail,
            collaborators.calendar,
            config.publish_timeout,
            config.calendar_timeout,
        );

        Self {
            intake: IntakeNormalizer::new(),
            classifier,
            priority: PriorityScorer::new(),
            router,
            publisher,
            store: collaborators.store,
            generator,
            limiter: Arc::new(Semaphore::new(config.max_inflight_external)),
            config,
        }
    }

    /// Process one raw message through the full pipeline.
    pub async fn process_email(&self, raw: &RawMessage) -> ProcessingResult {
        info!(message_id = %raw.message_id, "Processing inbound email");

        // Stage 1: intake — local, no permit needed
        let email = match self.intake.normalize(raw) {
            Ok(email) => email,
            Err(e) => {
                error!(message_id = %raw.message_id, error = %e, "Intake failed");
                return ProcessingResult::failure(Stage::Intake, e);
            }
        };

        // Everything from here talks to external collaborators — bound the
        // number of in-flight invocations.
        let _permit = self.limiter.acquire().await.ok();

        // Stage 2: classification (retried) + priority (local)
        let decision = match retry::with_retry(
            &self.config.classify_retry,
            "classification",
            ClassifyError::is_transient,
            || self.classifier.classify(&email),
        )
        .await
        {
            Ok(decision) => decision,
            Err(e) => {
                error!(message_id = %raw.message_id, error = %e, "Classification failed");
                return ProcessingResult::failure(Stage::Classification, e);
            }
        };

        let (priority, priority_confidence) =
            self.priority.score(&classification_text(&email));

        let classification = Classification {
            category: decision.category,
            category_confidence: decision.confidence,
            priority,
            priority_confidence,
            distribution: decision.distribution,
        };
        debug!(
            message_id = %raw.message_id,
            category = classification.category.label(),
            category_confidence = classification.category_confidence,
            priority = classification.priority.label(),
            "Email classified"
        );

        let disposition = self.gate(&classification);

        // Stage 3: routing — total over the closed category set
        let responder = self.router.responder_for(classification.category);

        // Stage 4: generation
        let draft = match responder.generate(&email, &classification).await {
            Ok(draft) => draft,
            Err(e) => {
                error!(
                    message_id = %raw.message_id,
                    category = classification.category.label(),
                    error = %e,
                    "Response generation failed"
                );
                return ProcessingResult::failure(Stage::Generation, e);
            }
        };

        // Stage 5: publishing — on failure the draft body is still returned
        let published = match self.publisher.publish(&draft, &raw.message_id).await {
            Ok(published) => published,
            Err(e) => {
                error!(message_id = %raw.message_id, error = %e, "Draft publish failed");
                return ProcessingResult::Failure {
                    stage: Stage::Publishing,
                    error: e.into(),
                    draft: Some(draft),
                };
            }
        };

        // Stage 6: persistence — after publishing, never unwinds the draft
        let email_record = EmailRecord {
            message_id: raw.message_id.clone(),
            sender: email.message.sender.clone(),
            subject: email.message.subject.clone(),
            body: email.cleaned_body.clone(),
            category: classification.category,
            category_confidence: classification.category_confidence,
            priority: classification.priority,
            priority_confidence: classification.priority_confidence,
            received_at: email.message.received_at,
            processed_at: Utc::now(),
        };
        let response_record = ResponseRecord {
            draft_id: published.draft_id.clone(),
            body: draft.body.clone(),
            kind: draft.kind,
            payload: draft.payload.clone(),
            model_version: self.generator.model_name().to_string(),
            generated_at: draft.created_at,
        };

        let write = tokio::time::timeout(
            self.config.persist_timeout,
            self.store.write_email_and_response(&email_record, &response_record),
        )
        .await
        .unwrap_or(Err(StoreError::Timeout { timeout: self.config.persist_timeout }));

        if let Err(e) = write {
            // The draft already exists in the mailbox — surface the gap
            // instead of hiding it or deleting a human-visible draft.
            error!(
                message_id = %raw.message_id,
                draft_id = %published.draft_id,
                error = %e,
                "Record write failed; draft remains in mailbox without a record"
            );
            return ProcessingResult::Failure {
                stage: Stage::Persistence,
                error: e.into(),
                draft: Some(draft),
            };
        }

        info!(
            message_id = %raw.message_id,
            draft_id = %published.draft_id,
            category = classification.category.label(),
            "Email processed"
        );
        ProcessingResult::Success {
            classification,
            draft,
            draft_id: published.draft_id,
            disposition,
        }
    }

    /// Confidence gating. Never changes the route — the arg-max category is
    /// always honored; low confidence only flags the draft for review.
    fn gate(&self, classification: &Classification) -> Disposition {
        let confidence = classification.category_confidence;
        if confidence >= self.config.auto_approve_threshold {
            Disposition::AutoApprove
        } else {
            if confidence < self.config.min_confidence {
                warn!(
                    category = classification.category.label(),
                    confidence,
                    threshold = self.config.min_confidence,
                    "Low-confidence classification, draft flagged for review"
                );
            }
            Disposition::NeedsReview
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::clients::classification::CategoryDistribution;
    use crate::clients::fixtures::{
        CannedGenerator, MemoryRecordStore, RecordingMailbox, StaticCalendar, StaticHistory,
        StaticKnowledgeBase,
    };
    use crate::clients::generation::CompletionRequest;
    use crate::error::GenerateError;
    use crate::pipeline::types::Category;

    /// Classifier returning a fixed distribution peaked at one category.
    struct FixedClassifier {
        winner: Category,
    }

    #[async_trait]
    impl ClassificationService for FixedClassifier {
        async fn classify(&self, _text: &str) -> Result<CategoryDistribution, ClassifyError> {
            let pairs: Vec<(Category, f32)> = Category::ALL
                .iter()
                .map(|c| (*c, if *c == self.winner { 0.9 } else { 0.033 }))
                .collect();
            Ok(CategoryDistribution::from_pairs(&pairs))
        }
    }

    /// Counts completion calls before delegating to the canned generator.
    struct CountingGenerator {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl GenerationService for CountingGenerator {
        fn model_name(&self) -> &str {
            "counting-v1"
        }

        async fn complete(&self, request: CompletionRequest) -> Result<String, GenerateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            CannedGenerator.complete(request).await
        }
    }

    fn raw_email(subject: &str, body: &str) -> RawMessage {
        RawMessage {
            message_id: "msg-100".into(),
            received_at: Utc::now(),
            raw: format!(
                "From: user@example.com\r\nTo: desk@acme.test\r\n\
                 Subject: {subject}\r\nContent-Type: text/plain\r\n\r\n{body}"
            )
            .into_bytes(),
        }
    }

    fn orchestrator_with(
        classifier: Arc<dyn ClassificationService>,
        generator: Arc<dyn GenerationService>,
        mailbox: Arc<RecordingMailbox>,
        store: Arc<MemoryRecordStore>,
    ) -> Orchestrator {
        Orchestrator::new(
            Collaborators {
                classifier,
                generator,
                calendar: Arc::new(StaticCalendar::new(vec![])),
                knowledge: Arc::new(StaticKnowledgeBase::new(vec![])),
                history: Arc::new(StaticHistory::empty()),
                mail: mailbox,
                store,
            },
            PipelineConfig::default(),
        )
    }

    #[tokio::test]
    async fn success_publishes_then_persists() {
        let mailbox = Arc::new(RecordingMailbox::new());
        let store = Arc::new(MemoryRecordStore::new());
        let orchestrator = orchestrator_with(
            Arc::new(FixedClassifier { winner: Category::Inquiry }),
            Arc::new(CannedGenerator),
            mailbox.clone(),
            store.clone(),
        );

        let result = orchestrator
            .process_email(&raw_email("Plan question", "What does the plan include?"))
            .await;

        let ProcessingResult::Success { classification, draft_id, .. } = result else {
            panic!("expected success, got {result:?}");
        };
        assert_eq!(classification.category, Category::Inquiry);
        assert_eq!(mailbox.drafts().len(), 1);
        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].1.draft_id, draft_id);
        assert_eq!(records[0].1.model_version, "canned-v1");
    }

    #[tokio::test]
    async fn unparseable_message_fails_at_intake() {
        let orchestrator = orchestrator_with(
            Arc::new(FixedClassifier { winner: Category::Inquiry }),
            Arc::new(CannedGenerator),
            Arc::new(RecordingMailbox::new()),
            Arc::new(MemoryRecordStore::new()),
        );

        let raw = RawMessage {
            message_id: "bad-1".into(),
            received_at: Utc::now(),
            raw: b"\xff\xfe not a message".to_vec(),
        };
        let result = orchestrator.process_email(&raw).await;
        assert_eq!(result.failed_stage(), Some(Stage::Intake));
    }

    struct DownClassifier;

    #[async_trait]
    impl ClassificationService for DownClassifier {
        async fn classify(&self, _text: &str) -> Result<CategoryDistribution, ClassifyError> {
            Err(ClassifyError::InvalidResponse { reason: "bad payload".into() })
        }
    }

    #[tokio::test]
    async fn classification_failure_skips_generation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let orchestrator = orchestrator_with(
            Arc::new(DownClassifier),
            Arc::new(CountingGenerator { calls: calls.clone() }),
            Arc::new(RecordingMailbox::new()),
            Arc::new(MemoryRecordStore::new()),
        );

        let result = orchestrator
            .process_email(&raw_email("Hello", "anything"))
            .await;
        assert_eq!(result.failed_stage(), Some(Stage::Classification));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn gating_flags_low_confidence_for_review() {
        /// Peaks at 0.5 — below min_confidence.
        struct Unsure;

        #[async_trait]
        impl ClassificationService for Unsure {
            async fn classify(&self, _text: &str) -> Result<CategoryDistribution, ClassifyError> {
                Ok(CategoryDistribution::from_pairs(&[
                    (Category::Inquiry, 0.5),
                    (Category::Support, 0.3),
                    (Category::Meeting, 0.1),
                    (Category::FollowUp, 0.1),
                ]))
            }
        }

        let orchestrator = orchestrator_with(
            Arc::new(Unsure),
            Arc::new(CannedGenerator),
            Arc::new(RecordingMailbox::new()),
            Arc::new(MemoryRecordStore::new()),
        );

        let result = orchestrator
            .process_email(&raw_email("Hmm", "ambiguous text"))
            .await;
        let ProcessingResult::Success { disposition, classification, .. } = result else {
            panic!("expected success");
        };
        // Low confidence still routes to the arg-max category
        assert_eq!(classification.category, Category::Inquiry);
        assert_eq!(disposition, Disposition::NeedsReview);
    }

    #[tokio::test]
    async fn high_confidence_is_auto_approvable() {
        struct Confident;

        #[async_trait]
        impl ClassificationService for Confident {
            async fn classify(&self, _text: &str) -> Result<CategoryDistribution, ClassifyError> {
                Ok(CategoryDistribution::from_pairs(&[
                    (Category::Inquiry, 0.97),
                    (Category::Support, 0.01),
                    (Category::Meeting, 0.01),
                    (Category::FollowUp, 0.01),
                ]))
            }
        }

        let orchestrator = orchestrator_with(
            Arc::new(Confident),
            Arc::new(CannedGenerator),
            Arc::new(RecordingMailbox::new()),
            Arc::new(MemoryRecordStore::new()),
        );

        let result = orchestrator
            .process_email(&raw_email("Clear", "obvious inquiry"))
            .await;
        let ProcessingResult::Success { disposition, .. } = result else {
            panic!("expected success");
        };
        assert_eq!(disposition, Disposition::AutoApprove);
    }
}
