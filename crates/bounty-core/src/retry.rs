//! Bounded retry with exponential backoff for collaborator calls.

use std::{future::Future, time::Duration};

use tracing::warn;

use crate::client::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Total attempts, including the first. Treated as at least 1.
  pub max_attempts: u32,
  pub base_delay:   Duration,
  pub max_delay:    Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 3,
      base_delay:   Duration::from_millis(200),
      max_delay:    Duration::from_secs(2),
    }
  }
}

impl RetryPolicy {
  /// A policy that makes exactly one attempt.
  pub fn none() -> Self { Self { max_attempts: 1, ..Self::default() } }

  /// Delay before attempt `attempt + 1`, where `attempt` starts at 1.
  pub fn delay_after(&self, attempt: u32) -> Duration {
    let factor = 1u32 << attempt.saturating_sub(1).min(16);
    self.base_delay.saturating_mul(factor).min(self.max_delay)
  }

  /// Run `op` until it succeeds, fails with an error `retry_if` rejects, or
  /// the attempt budget is spent. The last error is returned.
  pub async fn run<T, F, Fut>(
    &self,
    what: &str,
    retry_if: fn(&ClientError) -> bool,
    mut op: F,
  ) -> Result<T, ClientError>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
  {
    let attempts = self.max_attempts.max(1);
    let mut attempt = 1;
    loop {
      match op().await {
        Ok(v) => return Ok(v),
        Err(e) if attempt < attempts && retry_if(&e) => {
          let delay = self.delay_after(attempt);
          warn!(
            call = what,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %e,
            "collaborator call failed, retrying"
          );
          tokio::time::sleep(delay).await;
          attempt += 1;
        }
        Err(e) => return Err(e),
      }
    }
  }
}
