//! Classification service contract.
//!
//! The model itself is a black box behind [`ClassificationService`]: it
//! takes normalized text and returns a probability distribution over the
//! closed category set. [`HttpClassificationService`] is the reference
//! implementation for a hosted JSON endpoint.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::ClassifyError;
use crate::pipeline::types::Category;

/// One category probability from the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: Category,
    pub probability: f32,
}

/// Probability distribution over the category set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryDistribution {
    pub scores: Vec<CategoryScore>,
}

impl CategoryDistribution {
    /// Build a distribution from `(category, probability)` pairs.
    pub fn from_pairs(pairs: &[(Category, f32)]) -> Self {
        Self {
            scores: pairs
                .iter()
                .map(|(category, probability)| CategoryScore {
                    category: *category,
                    probability: *probability,
                })
                .collect(),
        }
    }

    /// Probability assigned to `category`, 0.0 when absent.
    pub fn probability_of(&self, category: Category) -> f32 {
        self.scores
            .iter()
            .find(|s| s.category == category)
            .map_or(0.0, |s| s.probability)
    }

    /// Highest-probability category. Ties resolve to the earlier entry in
    /// [`Category::ALL`] so the pick is deterministic.
    pub fn argmax(&self) -> Option<(Category, f32)> {
        let mut best: Option<(Category, f32)> = None;
        for category in Category::ALL {
            let p = self.probability_of(category);
            if self.scores.iter().any(|s| s.category == category)
                && best.is_none_or(|(_, bp)| p > bp)
            {
                best = Some((category, p));
            }
        }
        best
    }

    /// Pairs in canonical category order, for the classification record.
    pub fn as_pairs(&self) -> Vec<(Category, f32)> {
        Category::ALL
            .iter()
            .filter(|c| self.scores.iter().any(|s| s.category == **c))
            .map(|c| (*c, self.probability_of(*c)))
            .collect()
    }
}

/// Black-box text classification service.
#[async_trait]
pub trait ClassificationService: Send + Sync {
    /// Classify already-truncated text into the category set.
    async fn classify(&self, text: &str) -> Result<CategoryDistribution, ClassifyError>;
}

// ── HTTP implementation ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    scores: Vec<CategoryScore>,
}

/// JSON-over-HTTP classification client.
///
/// `POST {endpoint}` with `{"text": ...}`, expects
/// `{"scores": [{"category": "...", "probability": ...}, ...]}`.
pub struct HttpClassificationService {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
}

impl HttpClassificationService {
    pub fn new(endpoint: impl Into<String>, api_key: Option<SecretString>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key,
        }
    }
}

#[async_trait]
impl ClassificationService for HttpClassificationService {
    async fn classify(&self, text: &str) -> Result<CategoryDistribution, ClassifyError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&ClassifyRequest { text });
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClassifyError::Unavailable { reason: e.to_string() })?;

        if !response.status().is_success() {
            return Err(ClassifyError::Unavailable {
                reason: format!("status {}", response.status()),
            });
        }

        let body: ClassifyResponse = response
            .json()
            .await
            .map_err(|e| ClassifyError::InvalidResponse { reason: e.to_string() })?;

        Ok(CategoryDistribution { scores: body.scores })
    }
}
