//! Priority scorer — rule-based urgency, independent of the ML classifier.
//!
//! Pure, local, deterministic. Each level owns a disjoint keyword set;
//! levels are scored by case-insensitive substring occurrence counts over
//! the same subject+body text the classifier sees.

use crate::pipeline::types::Priority;

/// Keywords per level. A keyword appears in exactly one set.
const URGENT_KEYWORDS: &[&str] = &["urgent", "asap", "emergency", "immediate"];
const HIGH_KEYWORDS: &[&str] = &["important", "priority", "critical"];
const MEDIUM_KEYWORDS: &[&str] = &["please", "when possible", "need"];
const LOW_KEYWORDS: &[&str] = &["fyi", "update", "newsletter"];

/// Confidence when no keyword fires at all.
const NEUTRAL_CONFIDENCE: f32 = 0.5;

/// Rule-based urgency scorer.
pub struct PriorityScorer {
    levels: [(Priority, &'static [&'static str]); 4],
}

impl Default for PriorityScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl PriorityScorer {
    pub fn new() -> Self {
        Self {
            levels: [
                (Priority::Urgent, URGENT_KEYWORDS),
                (Priority::High, HIGH_KEYWORDS),
                (Priority::Medium, MEDIUM_KEYWORDS),
                (Priority::Low, LOW_KEYWORDS),
            ],
        }
    }

    /// Score urgency. Returns the winning level and a confidence in `[0, 1]`:
    /// the winner's count over the total, or Medium at 0.5 when nothing
    /// matches.
    pub fn score(&self, text: &str) -> (Priority, f32) {
        let lower = text.to_lowercase();

        let counts: Vec<(Priority, usize)> = self
            .levels
            .iter()
            .map(|(level, keywords)| {
                let count = keywords
                    .iter()
                    .map(|k| lower.matches(k).count())
                    .sum::<usize>();
                (*level, count)
            })
            .collect();

        let total: usize = counts.iter().map(|(_, c)| c).sum();
        if total == 0 {
            return (Priority::Medium, NEUTRAL_CONFIDENCE);
        }

        // Strictly-higher counts win; equal counts resolve by urgency rank,
        // never by enumeration order.
        let (winner, count) = counts
            .iter()
            .copied()
            .max_by_key(|(level, count)| (*count, level.rank()))
            .unwrap_or((Priority::Medium, 0));

        (winner, count as f32 / total as f32)
    }
}
