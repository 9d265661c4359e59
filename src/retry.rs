use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::defaults::{BASE_DELAY_MS, MAX_ATTEMPTS};

/// Retry configuration with exponential backoff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Total attempts, including the first one
  pub max_attempts: u32,
  pub base_delay: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: MAX_ATTEMPTS,
      base_delay: Duration::from_millis(BASE_DELAY_MS),
    }
  }
}

impl RetryPolicy {
  /// Delay after failed attempt `attempt` (1-based): base * 2^(attempt - 1)
  pub fn delay_before_retry(&self, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    self.base_delay.saturating_mul(1u32 << exponent)
  }

  /// Sum of every backoff delay the policy can incur
  pub fn total_backoff(&self) -> Duration {
    (1..self.max_attempts).map(|a| self.delay_before_retry(a)).sum()
  }
}

/// Injectable sleep so retry timing can be tested without waiting
#[async_trait]
pub trait Sleeper: Send + Sync {
  async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
  async fn sleep(&self, duration: Duration) {
    tokio::time::sleep(duration).await;
  }
}

/// The last error seen and how many attempts were made
#[derive(Debug)]
pub struct RetryFailure<E> {
  pub error: E,
  pub attempts: u32,
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy runs out of attempts. Attempts are strictly sequential and the
/// backoff delay is only awaited before a retry.
pub async fn execute_with_retry<T, E, F, Fut, P>(
  policy: &RetryPolicy,
  sleeper: &dyn Sleeper,
  is_retryable: P,
  mut op: F,
) -> Result<T, RetryFailure<E>>
where
  F: FnMut(u32) -> Fut,
  Fut: Future<Output = Result<T, E>>,
  P: Fn(&E) -> bool,
  E: std::fmt::Display,
{
  let max_attempts = policy.max_attempts.max(1);
  let mut attempt = 1;

  loop {
    match op(attempt).await {
      Ok(value) => return Ok(value),
      Err(error) => {
        if !is_retryable(&error) {
          tracing::debug!(attempt, %error, "Non-retryable failure");
          return Err(RetryFailure {
            error,
            attempts: attempt,
          });
        }

        if attempt >= max_attempts {
          tracing::warn!(attempts = attempt, %error, "Max attempts exceeded");
          return Err(RetryFailure {
            error,
            attempts: attempt,
          });
        }

        let delay = policy.delay_before_retry(attempt);
        tracing::warn!(
          attempt,
          delay_ms = delay.as_millis() as u64,
          %error,
          "Attempt failed, retrying"
        );
        sleeper.sleep(delay).await;
        attempt += 1;
      }
    }
  }
}
