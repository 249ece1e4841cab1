//! Classifier client — bridges the pipeline to the classification service.
//!
//! Owns the request contract: concatenate subject and body, truncate to the
//! character budget BEFORE the call (never silently drop the request), then
//! pick the arg-max of the returned distribution. Service failures are
//! reported, not defaulted — routing on a guessed classification would be
//! unsound.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::clients::classification::{CategoryDistribution, ClassificationService};
use crate::error::ClassifyError;
use crate::pipeline::types::{Category, NormalizedEmail};

/// Classification outcome before priority scoring is merged in.
#[derive(Debug, Clone)]
pub struct CategoryDecision {
    pub category: Category,
    pub confidence: f32,
    pub distribution: Vec<(Category, f32)>,
}

/// Client for the external classification service.
pub struct ClassifierClient {
    service: Arc<dyn ClassificationService>,
    char_budget: usize,
    timeout: Duration,
}

impl ClassifierClient {
    pub fn new(
        service: Arc<dyn ClassificationService>,
        char_budget: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            service,
            char_budget,
            timeout,
        }
    }

    /// Classify a normalized email into the category set.
    pub async fn classify(&self, email: &NormalizedEmail) -> Result<CategoryDecision, ClassifyError> {
        let text = classification_text(email);
        let truncated = truncate_chars(&text, self.char_budget);

        let distribution =
            match tokio::time::timeout(self.timeout, self.service.classify(truncated)).await {
                Ok(result) => result?,
                Err(_) => return Err(ClassifyError::Timeout { timeout: self.timeout }),
            };

        let decision = decide(&distribution)?;
        debug!(
            category = decision.category.label(),
            confidence = decision.confidence,
            "Email classified"
        );
        Ok(decision)
    }
}

/// The text both the classifier and the priority scorer operate on.
pub fn classification_text(email: &NormalizedEmail) -> String {
    format!("{}\n\n{}", email.message.subject, email.cleaned_body)
}

/// Truncate to at most `max` characters, on a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Validate a distribution and pick the arg-max category.
fn decide(distribution: &CategoryDistribution) -> Result<CategoryDecision, ClassifyError> {
    if distribution
        .scores
        .iter()
        .any(|s| !s.probability.is_finite())
    {
        return Err(ClassifyError::InvalidResponse {
            reason: "non-finite probability".into(),
        });
    }

    let (category, confidence) =
        distribution
            .argmax()
            .ok_or_else(|| ClassifyError::InvalidResponse {
                reason: "empty distribution".into(),
            })?;

    Ok(CategoryDecision {
        category,
        confidence: confidence.clamp(0.0, 1.0),
        distribution: distribution.as_pairs(),
    })
}
