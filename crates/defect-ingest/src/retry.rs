//! Bounded exponential backoff for remote fetches.

use std::{future::Future, time::Duration};

use serde::{Deserialize, Serialize};

use crate::source::FetchError;

/// How many times to try a fetch and how long to wait in between.
///
/// The wait before retry `n` (0-based) is `initial_backoff_ms * 2^n`, capped
/// at `max_backoff_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
  pub max_attempts:       u32,
  pub initial_backoff_ms: u64,
  pub max_backoff_ms:     u64,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts:       3,
      initial_backoff_ms: 500,
      max_backoff_ms:     8_000,
    }
  }
}

impl RetryPolicy {
  /// `max_attempts` tries with no waiting in between.
  pub fn immediate(max_attempts: u32) -> Self {
    Self {
      max_attempts,
      initial_backoff_ms: 0,
      max_backoff_ms: 0,
    }
  }

  pub fn delay_for(&self, retry: u32) -> Duration {
    let factor = 2u64.saturating_pow(retry);
    let ms = self
      .initial_backoff_ms
      .saturating_mul(factor)
      .min(self.max_backoff_ms);
    Duration::from_millis(ms)
  }

  fn attempts(&self) -> u32 { self.max_attempts.max(1) }
}

/// The last error seen once a fetch has given up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryFailure {
  pub attempts: u32,
  pub error:    FetchError,
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are used up.
pub async fn with_retry<T, F, Fut>(
  policy: &RetryPolicy,
  label:  &str,
  mut op: F,
) -> Result<T, RetryFailure>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T, FetchError>>,
{
  let max = policy.attempts();
  let mut attempt = 0;

  loop {
    attempt += 1;

    match op().await {
      Ok(value) => {
        if attempt > 1 {
          tracing::debug!(operation = label, attempt, "succeeded after retry");
        }
        return Ok(value);
      }
      Err(error) if error.is_retryable() && attempt < max => {
        let delay = policy.delay_for(attempt - 1);
        tracing::warn!(
          operation = label,
          attempt,
          max_attempts = max,
          delay_ms = delay.as_millis() as u64,
          %error,
          "fetch failed, retrying"
        );
        tokio::time::sleep(delay).await;
      }
      Err(error) => {
        return Err(RetryFailure { attempts: attempt, error });
      }
    }
  }
}
