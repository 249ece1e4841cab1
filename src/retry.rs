//! Bounded retry with exponential backoff for transient collaborator failures.
//!
//! Only the orchestrator-boundary calls (classification, generation) are
//! retried. Knowledge-base and history lookups degrade to empty results
//! instead — retrying a non-fatal enrichment would just add latency.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Backoff policy for one collaborator.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first. 1 disables retries.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Multiplier applied per retry.
    pub multiplier: f64,
    /// Randomize each delay to 50–100% of its nominal value.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Nominal delay before retry number `attempt` (1-based).
    fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.multiplier.powi(attempt.saturating_sub(1) as i32);
        let nominal = self.initial_delay.as_secs_f64() * exp;
        let capped = nominal.min(self.max_delay.as_secs_f64());
        let scaled = if self.jitter {
            capped * (0.5 + rand::random::<f64>() * 0.5)
        } else {
            capped
        };
        Duration::from_secs_f64(scaled)
    }
}

/// Run `op` until it succeeds, the error is not transient, or attempts run out.
///
/// `is_transient` decides which errors are worth another attempt; the final
/// error is returned unchanged either way.
pub async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    service: &'static str,
    is_transient: impl Fn(&E) -> bool,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_attempts && is_transient(&e) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    service,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
