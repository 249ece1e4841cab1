//! Deterministic in-process collaborators.
//!
//! Used by the demo binary and the integration tests so the full pipeline
//! can run without any hosted service. Behavior is intentionally simple and
//! reproducible: no randomness, no I/O, sequence-numbered ids.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::clients::calendar::{BusyInterval, CalendarClient};
use crate::clients::classification::{CategoryDistribution, ClassificationService};
use crate::clients::generation::{CompletionRequest, GenerationService};
use crate::clients::history::{ConversationHistory, HistoryPage};
use crate::clients::knowledge::{Article, KnowledgeBase};
use crate::clients::mail::MailTransport;
use crate::error::{CalendarError, ClassifyError, GenerateError, HistoryError, KbError, MailError, StoreError};
use crate::pipeline::types::{Category, EventDraft};
use crate::store::traits::{EmailRecord, RecordStore, ResponseRecord};

// ── Classification ──────────────────────────────────────────────────

/// Keyword-cue classifier: picks a category from obvious phrases and peaks
/// the distribution at it.
pub struct KeywordClassifier;

impl KeywordClassifier {
    fn category_for(text: &str) -> Category {
        let lower = text.to_lowercase();
        if ["follow up", "following up", "circling back", "checking in"]
            .iter()
            .any(|cue| lower.contains(cue))
        {
            Category::FollowUp
        } else if ["meet", "meeting", "schedule", "call", "availability"]
            .iter()
            .any(|cue| lower.contains(cue))
        {
            Category::Meeting
        } else if ["error", "issue", "problem", "cannot", "can't", "broken", "login"]
            .iter()
            .any(|cue| lower.contains(cue))
        {
            Category::Support
        } else {
            Category::Inquiry
        }
    }
}

#[async_trait]
impl ClassificationService for KeywordClassifier {
    async fn classify(&self, text: &str) -> Result<CategoryDistribution, ClassifyError> {
        let winner = Self::category_for(text);
        let pairs: Vec<(Category, f32)> = Category::ALL
            .iter()
            .map(|c| (*c, if *c == winner { 0.85 } else { 0.05 }))
            .collect();
        Ok(CategoryDistribution::from_pairs(&pairs))
    }
}

// ── Generation ──────────────────────────────────────────────────────

/// Canned completion service. Inspects the prompt for the per-category
/// instruction blocks the responders emit and returns a matching body.
pub struct CannedGenerator;

#[async_trait]
impl GenerationService for CannedGenerator {
    fn model_name(&self) -> &str {
        "canned-v1"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, GenerateError> {
        let prompt = request.prompt.to_lowercase();
        let text = if prompt.contains("step-by-step") {
            "We have looked into the issue you reported.\n\
             1. Clear your browser cache and cookies.\n\
             2. Reset your password from the sign-in page.\n\
             3. Try signing in again from a private window.\n\
             If the problem persists, reply to this message and we will \
             escalate it."
        } else if prompt.contains("available time slots") {
            "Thank you for reaching out about scheduling. I have listed the \
             times I am available below; any of them works on my side. Let \
             me know which one suits you and I will send an invitation."
        } else if prompt.contains("follow-up") {
            "Thanks for staying in touch. Picking up where we left off, the \
             next step on our side is ready, and I have summarized the \
             remaining open items below."
        } else {
            "Thank you for your message. We have reviewed your request and \
             will make sure the right person gets back to you with the \
             details you asked about."
        };
        Ok(text.to_string())
    }
}

// ── Calendar ────────────────────────────────────────────────────────

/// Calendar with a fixed busy list. Created events are recorded and given
/// sequential ids.
pub struct StaticCalendar {
    busy: Vec<BusyInterval>,
    created: Mutex<Vec<EventDraft>>,
    next_id: AtomicU64,
}

impl StaticCalendar {
    pub fn new(busy: Vec<BusyInterval>) -> Self {
        Self {
            busy,
            created: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Events registered via `create_draft_event`.
    pub fn created_events(&self) -> Vec<EventDraft> {
        self.created.lock().expect("calendar lock poisoned").clone()
    }
}

#[async_trait]
impl CalendarClient for StaticCalendar {
    async fn free_busy(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>, CalendarError> {
        Ok(self
            .busy
            .iter()
            .filter(|b| b.overlaps(start, end))
            .cloned()
            .collect())
    }

    async fn create_draft_event(&self, event: &EventDraft) -> Result<String, CalendarError> {
        self.created
            .lock()
            .expect("calendar lock poisoned")
            .push(event.clone());
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(format!("evt-{id}"))
    }
}

// ── Knowledge base ──────────────────────────────────────────────────

/// Knowledge base over a fixed article list. Honors limit and threshold;
/// the query itself is ignored.
pub struct StaticKnowledgeBase {
    articles: Vec<Article>,
}

impl StaticKnowledgeBase {
    pub fn new(articles: Vec<Article>) -> Self {
        Self { articles }
    }
}

#[async_trait]
impl KnowledgeBase for StaticKnowledgeBase {
    async fn search(
        &self,
        _query: &str,
        limit: usize,
        min_relevance: f32,
    ) -> Result<Vec<Article>, KbError> {
        Ok(self
            .articles
            .iter()
            .filter(|a| a.relevance >= min_relevance)
            .take(limit)
            .cloned()
            .collect())
    }
}

// ── Conversation history ────────────────────────────────────────────

/// History keyed by sender address.
pub struct StaticHistory {
    pages: HashMap<String, HistoryPage>,
}

impl StaticHistory {
    pub fn new(pages: HashMap<String, HistoryPage>) -> Self {
        Self { pages }
    }

    pub fn empty() -> Self {
        Self { pages: HashMap::new() }
    }
}

#[async_trait]
impl ConversationHistory for StaticHistory {
    async fn recent_for_sender(
        &self,
        sender: &str,
        limit: usize,
    ) -> Result<HistoryPage, HistoryError> {
        let mut page = self.pages.get(sender).cloned().unwrap_or_default();
        page.messages.truncate(limit);
        Ok(page)
    }
}

// ── Mail transport ──────────────────────────────────────────────────

/// A created draft, as recorded by [`RecordingMailbox`].
#[derive(Debug, Clone)]
pub struct CreatedDraft {
    pub draft_id: String,
    pub thread_id: String,
    pub body: String,
}

/// Mailbox that records drafts in memory and hands out sequential ids.
#[derive(Default)]
pub struct RecordingMailbox {
    drafts: Mutex<Vec<CreatedDraft>>,
    next_id: AtomicU64,
}

impl RecordingMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drafts(&self) -> Vec<CreatedDraft> {
        self.drafts.lock().expect("mailbox lock poisoned").clone()
    }
}

#[async_trait]
impl MailTransport for RecordingMailbox {
    async fn create_draft(&self, thread_id: &str, body: &str) -> Result<String, MailError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let draft_id = format!("draft-{id}");
        self.drafts
            .lock()
            .expect("mailbox lock poisoned")
            .push(CreatedDraft {
                draft_id: draft_id.clone(),
                thread_id: thread_id.to_string(),
                body: body.to_string(),
            });
        Ok(draft_id)
    }
}

// ── Record store ────────────────────────────────────────────────────

/// In-memory record store for tests and demos.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<Vec<(EmailRecord, ResponseRecord)>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<(EmailRecord, ResponseRecord)> {
        self.records.lock().expect("store lock poisoned").clone()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn write_email_and_response(
        &self,
        email: &EmailRecord,
        response: &ResponseRecord,
    ) -> Result<(), StoreError> {
        self.records
            .lock()
            .expect("store lock poisoned")
            .push((email.clone(), response.clone()));
        Ok(())
    }
}
