//! The orchestration pipeline: intake → classification + priority →
//! routing → response generation → publishing → persistence.

pub mod classifier;
pub mod intake;
pub mod orchestrator;
pub mod priority;
pub mod publisher;
pub mod router;
pub mod types;

pub use classifier::ClassifierClient;
pub use intake::IntakeNormalizer;
pub use orchestrator::{Collaborators, Orchestrator};
pub use priority::PriorityScorer;
pub use publisher::DraftPublisher;
pub use router::Router;
