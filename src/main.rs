use std::sync::Arc;

use chrono::Utc;
use mail_pilot::clients::calendar::BusyInterval;
use mail_pilot::clients::fixtures::{
    CannedGenerator, KeywordClassifier, RecordingMailbox, StaticCalendar, StaticHistory,
    StaticKnowledgeBase,
};
use mail_pilot::clients::knowledge::Article;
use mail_pilot::config::PipelineConfig;
use mail_pilot::pipeline::types::{ProcessingResult, RawMessage};
use mail_pilot::pipeline::{Collaborators, Orchestrator};
use mail_pilot::store::LibSqlStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let db_path = std::env::var("MAIL_PILOT_DB_PATH")
        .unwrap_or_else(|_| "./data/mail-pilot.db".to_string());

    eprintln!("📬 mail-pilot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Database: {db_path}");
    eprintln!("   Collaborators: fixtures (no hosted services)\n");

    let store = Arc::new(LibSqlStore::new_local(std::path::Path::new(&db_path)).await?);
    let mailbox = Arc::new(RecordingMailbox::new());

    // Tomorrow morning is busy so the meeting sample has something to dodge
    let tomorrow = (Utc::now() + chrono::Duration::days(1)).date_naive();
    let busy = tomorrow
        .and_hms_opt(9, 0, 0)
        .zip(tomorrow.and_hms_opt(11, 0, 0))
        .map(|(start, end)| BusyInterval {
            start: start.and_utc(),
            end: end.and_utc(),
        })
        .into_iter()
        .collect();

    let orchestrator = Orchestrator::new(
        Collaborators {
            classifier: Arc::new(KeywordClassifier),
            generator: Arc::new(CannedGenerator),
            calendar: Arc::new(StaticCalendar::new(busy)),
            knowledge: Arc::new(StaticKnowledgeBase::new(sample_articles())),
            history: Arc::new(StaticHistory::empty()),
            mail: mailbox.clone(),
            store,
        },
        PipelineConfig::default(),
    );

    // Process .eml files from the command line, or the built-in samples
    let args: Vec<String> = std::env::args().skip(1).collect();
    let messages = if args.is_empty() {
        sample_messages()
    } else {
        let mut messages = Vec::new();
        for path in &args {
            let raw = std::fs::read(path)?;
            messages.push(RawMessage {
                message_id: format!("file-{path}"),
                received_at: Utc::now(),
                raw,
            });
        }
        messages
    };

    for raw in &messages {
        match orchestrator.process_email(raw).await {
            ProcessingResult::Success {
                classification,
                draft_id,
                disposition,
                ..
            } => {
                eprintln!(
                    "✓ {} → {} ({:.0}%), priority {} — draft {} [{:?}]",
                    raw.message_id,
                    classification.category.label(),
                    classification.category_confidence * 100.0,
                    classification.priority.label(),
                    draft_id,
                    disposition,
                );
            }
            ProcessingResult::Failure { stage, error, draft } => {
                eprintln!(
                    "✗ {} failed at {} — {} (draft salvaged: {})",
                    raw.message_id,
                    stage.label(),
                    error,
                    draft.is_some(),
                );
            }
        }
    }

    eprintln!("\nDrafts created:");
    for draft in mailbox.drafts() {
        eprintln!("── {} (thread {}) ──", draft.draft_id, draft.thread_id);
        eprintln!("{}\n", draft.body);
    }

    Ok(())
}

fn sample_articles() -> Vec<Article> {
    vec![
        Article {
            id: "kb-login".into(),
            title: "Resolving sign-in errors".into(),
            content: "Clear cookies, reset the password, retry in a private window.".into(),
            relevance: 0.9,
        },
        Article {
            id: "kb-billing".into(),
            title: "Duplicate charges".into(),
            content: "Duplicate subscription charges are refunded within 5 business days.".into(),
            relevance: 0.8,
        },
    ]
}

fn sample_messages() -> Vec<RawMessage> {
    let samples: [(&str, &str, &str); 4] = [
        (
            "user@example.com",
            "Cannot login to account",
            "Hi, I have been trying to login but keep getting errors.",
        ),
        (
            "customer@example.com",
            "Billing question",
            "I was charged twice for my subscription this month. \
             Please fix this urgent issue, I need an immediate refund.",
        ),
        (
            "prospect@example.com",
            "Product inquiry",
            "I would like to know more about your enterprise plan.",
        ),
        (
            "partner@example.com",
            "Quick sync?",
            "Could we schedule a call this week to discuss the rollout?",
        ),
    ];

    samples
        .iter()
        .enumerate()
        .map(|(i, (sender, subject, body))| RawMessage {
            message_id: format!("sample-{}", i + 1),
            received_at: Utc::now(),
            raw: format!(
                "From: {sender}\r\nTo: desk@acme.test\r\nSubject: {subject}\r\n\
                 Content-Type: text/plain\r\n\r\n{body}"
            )
            .into_bytes(),
        })
        .collect()
}
