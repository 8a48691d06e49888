//! Bounded retry with exponential backoff, jitter and an overall deadline.

use idfdocs_core::Error;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Retry settings for transient fetch failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt (default: 3)
    pub max_retries: u32,

    /// Delay before the first retry; doubles per attempt (default: 250ms)
    pub base_delay: Duration,

    /// Upper bound for the exponential part of the delay (default: 4s)
    pub max_delay: Duration,

    /// Whether to add up to half the delay again as random jitter (default: true)
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3, base_delay: Duration::from_millis(250), max_delay: Duration::from_secs(4), jitter: true }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt + 1`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        let delay = self.base_delay.saturating_mul(factor).min(self.max_delay);

        if !self.jitter {
            return delay;
        }

        let spread = (delay.as_millis() / 2) as u64;
        if spread == 0 {
            return delay;
        }
        delay + Duration::from_millis(rand::rng().random_range(0..=spread))
    }
}

/// Run `op` until it succeeds, fails permanently, retries run out, or `deadline` passes.
///
/// Each attempt is bounded by `attempt_timeout` (or the time left, if shorter)
/// and fails with `FetchTimeout` when it runs over. Only errors for which
/// [`Error::is_retryable`] holds are retried, and no backoff sleeps past the deadline.
pub async fn run<T, F, Fut>(
    policy: &RetryPolicy, deadline: Instant, attempt_timeout: Duration, target: &str, mut op: F,
) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let mut attempt = 0;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(Error::FetchTimeout(format!("deadline exceeded fetching {target}")));
        }

        let budget = remaining.min(attempt_timeout);
        let outcome = match tokio::time::timeout(budget, op()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::FetchTimeout(format!("{target} did not respond within {}ms", budget.as_millis()))),
        };

        let err = match outcome {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_retryable() || attempt >= policy.max_retries {
            return Err(err);
        }

        let delay = policy.delay(attempt);
        if Instant::now() + delay >= deadline {
            tracing::debug!("not retrying {} after {}: backoff would pass the deadline", target, err);
            return Err(err);
        }

        attempt += 1;
        tracing::debug!("retrying {} in {}ms (attempt {}): {}", target, delay.as_millis(), attempt, err);
        tokio::time::sleep(delay).await;
    }
}
