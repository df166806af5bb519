//! Bounded retry with exponential backoff.
//!
//! Used only at collaborator boundaries (HTTP fetch, database connect). The
//! feature pipeline and the trainer never retry.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry policy for a fallible asynchronous operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt, in milliseconds.
    pub initial_delay_ms: u64,
    /// Factor applied to the delay after every failed attempt.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 2_000,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that tries once and never waits.
    pub const fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay_ms: 0,
            multiplier: 1.0,
        }
    }

    /// Delay before attempt `attempt` (1-based; attempt 1 has no delay).
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let factor = self.multiplier.max(1.0).powi(attempt as i32 - 2);
        Duration::from_millis((self.initial_delay_ms as f64 * factor) as u64)
    }
}

/// Runs `op` until it succeeds or the policy's attempts are exhausted.
///
/// The error of the last attempt is returned.
///
/// # Example
///
/// ```
/// use ampere_traits::retry::{retry, RetryPolicy};
///
/// let rt = tokio::runtime::Builder::new_current_thread()
///     .enable_time()
///     .build()
///     .unwrap();
/// let value: Result<u32, String> =
///     rt.block_on(retry(RetryPolicy::no_retry(), "answer", || async { Ok(42) }));
/// assert_eq!(value.unwrap(), 42);
/// ```
pub async fn retry<T, E, F, Fut>(policy: RetryPolicy, label: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                let delay = policy.delay_before(attempt + 1);
                warn!(
                    "{label} failed (attempt {attempt}/{attempts}): {e}; retrying in {:?}",
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
