//! # Read Retry
//!
//! Bounded retry with exponential backoff for idempotent reads, used by
//! `FileSystem::read_file_retrying` and `Vault::read_file`. Writes are never
//! retried here: a timed-out write may still have been applied, so callers
//! re-read state instead.

use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::errors::VaultResult;

/// Backoff schedule for `retry_read`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Run `read`, retrying while it fails with a retryable error
pub fn retry_read<T, F>(policy: &RetryPolicy, op: &str, mut read: F) -> VaultResult<T>
where
    F: FnMut() -> VaultResult<T>,
{
    let mut attempt = 1;
    loop {
        match read() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.backoff(attempt);
                warn!(op, attempt, delay_ms = delay.as_millis() as u64, error = %e, "retrying read");
                thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
