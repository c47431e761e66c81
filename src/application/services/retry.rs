//! Exponential backoff shared by form submission and query fetching.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

/// Doubling backoff with a ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub base: Duration,
    /// Longest delay between attempts.
    pub max: Duration,
    /// Retries after the first attempt.
    pub max_retries: u32,
}

impl BackoffPolicy {
    /// Form submissions: 1s, 2s, 4s, capped at 10s, three retries.
    pub const FORMS: Self = Self::new(Duration::from_secs(1), Duration::from_secs(10), 3);

    /// Query fetches: 1s doubling up to 30s, three retries.
    pub const QUERIES: Self = Self::new(Duration::from_secs(1), Duration::from_secs(30), 3);

    /// Creates a policy.
    #[must_use]
    pub const fn new(base: Duration, max: Duration, max_retries: u32) -> Self {
        Self {
            base,
            max,
            max_retries,
        }
    }

    /// Policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, 0)
    }

    /// Returns a copy with a different retry count.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Delay before retry number `attempt` (0-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.min(16));
        self.base.saturating_mul(factor).min(self.max)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::FORMS
    }
}

/// Runs `operation` until it succeeds, returns a non-retryable error, or the
/// policy is exhausted. Returns the last error together with the attempt count.
///
/// # Errors
/// Returns the final error when no attempt succeeded.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &BackoffPolicy,
    label: &str,
    is_retryable: impl Fn(&E) -> bool,
    mut operation: F,
) -> Result<T, (E, u32)>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_retries && is_retryable(&e) => {
                let delay = policy.delay_for(attempt);
                attempt += 1;
                warn!(
                    operation = label,
                    attempt,
                    delay_ms = delay.as_millis(),
                    error = %e,
                    "Attempt failed, retrying"
                );
                sleep(delay).await;
            }
            Err(e) => {
                debug!(operation = label, attempts = attempt + 1, error = %e, "Giving up");
                return Err((e, attempt + 1));
            }
        }
    }
}
