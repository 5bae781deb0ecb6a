//! Retry policy for completion calls.
//!
//! Factored out so stages can opt in selectively; the pipeline applies
//! it to the tl;dr stage only by default.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::client::LlmError;

/// Calculate exponential backoff delay for a given attempt.
pub fn backoff_delay(attempt: u32, base_ms: u64) -> Duration {
    let delay_ms = base_ms.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(delay_ms.min(60_000))
}

/// How many times to retry a failed call and how long to wait between
/// attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt (0 = single attempt).
    pub retries: u32,
    /// Base delay in milliseconds, doubled on each retry.
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            base_delay_ms: 500,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            retries: 0,
            base_delay_ms: 0,
        }
    }

    /// Total attempts this policy allows.
    pub fn max_attempts(&self) -> u32 {
        self.retries + 1
    }

    /// Run `make_call` until it succeeds or the retry budget is spent.
    ///
    /// Returns the last error once all attempts fail.
    pub async fn run<F, Fut, T>(&self, label: &str, make_call: F) -> Result<T, LlmError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let mut attempt = 0;
        loop {
            match make_call().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.retries => {
                    let wait = backoff_delay(attempt, self.base_delay_ms);
                    warn!(
                        "{} call failed (attempt {}): {}, retrying in {:?}",
                        label,
                        attempt + 1,
                        err,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
