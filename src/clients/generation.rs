//! Generation service contract.
//!
//! Natural-language generation is a black box: prompt in, text out. The
//! pipeline never inspects or post-processes completions beyond template
//! rendering. [`RetryingGenerator`] wraps any implementation with the
//! orchestrator's timeout and transient-retry policy so responders stay
//! oblivious to both.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::GenerateError;
use crate::retry::{self, RetryPolicy};

/// Parameters for one completion call.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: 512,
            temperature: 0.7,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Black-box completion service.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Model identifier, recorded with every persisted response.
    fn model_name(&self) -> &str;

    /// Generate text for the given prompt.
    async fn complete(&self, request: CompletionRequest) -> Result<String, GenerateError>;
}

// ── HTTP implementation ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CompleteRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompleteResponse {
    text: String,
}

/// JSON-over-HTTP completion client.
///
/// `POST {endpoint}` with `{"model", "prompt", "max_tokens", "temperature"}`,
/// expects `{"text": "..."}`.
pub struct HttpGenerationService {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<SecretString>,
}

impl HttpGenerationService {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<SecretString>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            model: model.into(),
            api_key,
        }
    }
}

#[async_trait]
impl GenerationService for HttpGenerationService {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, GenerateError> {
        let mut http = self.client.post(&self.endpoint).json(&CompleteRequest {
            model: &self.model,
            prompt: &request.prompt,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        });
        if let Some(ref key) = self.api_key {
            http = http.bearer_auth(key.expose_secret());
        }

        let response = http
            .send()
            .await
            .map_err(|e| GenerateError::Unavailable { reason: e.to_string() })?;

        if !response.status().is_success() {
            return Err(GenerateError::Unavailable {
                reason: format!("status {}", response.status()),
            });
        }

        let body: CompleteResponse = response
            .json()
            .await
            .map_err(|e| GenerateError::Unavailable { reason: e.to_string() })?;

        let text = body.text.trim().to_string();
        if text.is_empty() {
            return Err(GenerateError::EmptyCompletion);
        }
        Ok(text)
    }
}

// ── Retry decorator ─────────────────────────────────────────────────

/// Wraps a generation service with a per-call timeout and bounded retry for
/// transient failures. Composed once at orchestrator construction so every
/// responder shares the same policy.
pub struct RetryingGenerator {
    inner: Arc<dyn GenerationService>,
    policy: RetryPolicy,
    timeout: Duration,
}

impl RetryingGenerator {
    pub fn new(inner: Arc<dyn GenerationService>, policy: RetryPolicy, timeout: Duration) -> Self {
        Self {
            inner,
            policy,
            timeout,
        }
    }
}

#[async_trait]
impl GenerationService for RetryingGenerator {
    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, GenerateError> {
        retry::with_retry(
            &self.policy,
            "generation",
            GenerateError::is_transient,
            || async {
                match tokio::time::timeout(self.timeout, self.inner.complete(request.clone()))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(GenerateError::Timeout { timeout: self.timeout }),
                }
            },
        )
        .await
    }
}
