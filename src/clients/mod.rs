//! Collaborator contracts.
//!
//! Every external dependency the pipeline touches lives behind one of these
//! traits: classification, generation, calendar, knowledge base,
//! conversation history, and mail transport. The orchestrator receives
//! already-constructed handles — nothing in the pipeline reaches into
//! process-wide state.

pub mod calendar;
pub mod classification;
pub mod fixtures;
pub mod generation;
pub mod history;
pub mod knowledge;
pub mod mail;

pub use calendar::{BusyInterval, CalendarClient};
pub use classification::{CategoryDistribution, CategoryScore, ClassificationService, HttpClassificationService};
pub use generation::{CompletionRequest, GenerationService, HttpGenerationService, RetryingGenerator};
pub use history::{ConversationHistory, HistoryPage, PastMessage};
pub use knowledge::{Article, KnowledgeBase};
pub use mail::MailTransport;
