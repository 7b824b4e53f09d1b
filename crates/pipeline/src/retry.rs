//! Bounded retry with exponential backoff for provider calls.

use std::future::Future;
use std::time::Duration;

use crate::error::ProviderError;

/// Retry budget applied to external provider calls.
///
/// Each attempt is bounded by `call_timeout`; an attempt that times out
/// counts as transient. Mint submissions are deliberately outside this
/// helper: a mint is sent at most once and resolved by polling.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
            call_timeout: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// A policy with no waiting, for tests.
    pub fn immediate() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::ZERO,
            call_timeout: Duration::from_secs(5),
        }
    }

    fn delay_before(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Invokes `call` until it succeeds, fails permanently, or the retry
/// budget is exhausted. Exhaustion surfaces the last transient error.
pub async fn call_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &'static str,
    mut call: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<T, ProviderError>> + Send,
{
    let mut last_error = None;

    for attempt in 1..=policy.max_attempts.max(1) {
        if attempt > 1 {
            tokio::time::sleep(policy.delay_before(attempt - 1)).await;
        }

        let outcome = match tokio::time::timeout(policy.call_timeout, call()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProviderError::Transient(format!(
                "{label} timed out after {:?}",
                policy.call_timeout
            ))),
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(e @ ProviderError::Permanent(_)) => return Err(e),
            Err(ProviderError::Transient(reason)) => {
                metrics::counter!("pipeline_provider_retries_total", "call" => label)
                    .increment(1);
                tracing::warn!(call = label, attempt, %reason, "transient provider failure");
                last_error = Some(ProviderError::Transient(reason));
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| ProviderError::Transient(format!("{label}: no attempts made"))))
}
