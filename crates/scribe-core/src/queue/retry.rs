//! Retry policy: exponential backoff with jitter.
//!
//! Used by the queue to schedule failed jobs, and on its own (via
//! [`retry_call`]) for any retrying outbound call.

use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Default attempt budget for [`retry_call`] and for jobs.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Backoff policy for failed attempts.
///
/// `delay = min(max_delay, base_delay * factor^(attempt-1))`, perturbed by
/// additive jitter drawn from `[0, delay * jitter_ratio]`. Jitter spreads
/// retries out so failed jobs don't stampede back in lockstep.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub factor: f64,
    pub max_delay: Duration,
    pub jitter_ratio: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(300),
            factor: 2.0,
            max_delay: Duration::from_millis(5000),
            jitter_ratio: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Delay before the next try, given the number of attempts already made
    /// (1-indexed: pass 1 after the first failure).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.delay_with(&mut rand::thread_rng(), attempt)
    }

    /// Same as [`RetryPolicy::delay_for`] with a caller-supplied random
    /// source, deterministic given a seeded rng.
    pub fn delay_with<R: Rng + ?Sized>(&self, rng: &mut R, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(64) as i32;
        let base = self.base_delay.as_secs_f64();
        let capped = (base * self.factor.powi(exponent)).min(self.max_delay.as_secs_f64());

        let jitter = if self.jitter_ratio > 0.0 {
            rng.gen_range(0.0..=capped * self.jitter_ratio)
        } else {
            0.0
        };

        Duration::from_secs_f64(capped + jitter)
    }
}

/// Run an async operation with retries under `policy`.
///
/// Retries up to `max_attempts` total calls, sleeping the backoff delay
/// between tries. Errors rejected by `is_retryable` propagate immediately
/// without consuming the backoff schedule.
pub async fn retry_call<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    max_attempts: u32,
    mut is_retryable: P,
    mut call: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: FnMut(&E) -> bool,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match call().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < max_attempts && is_retryable(&error) => {
                let delay = policy.delay_with(&mut rand::thread_rng(), attempt);
                tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying call");
                tokio::time::sleep(delay).await;
            }
            Err(error) => return Err(error),
        }
    }
}
