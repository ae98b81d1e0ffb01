//! Retry policy for remote fetches.
//!
//! The remote service throttles aggressively but recovers quickly, so the
//! policy is a fixed interval with a bounded attempt budget rather than
//! exponential growth.

use std::thread;
use std::time::Duration;

use tracing::warn;

use super::client::FetchError;

/// Retry policy applied to every remote fetch.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts before giving up, including the first.
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Whether `error` warrants another attempt after `attempt` tries.
    pub fn should_retry(&self, error: &FetchError, attempt: u32) -> bool {
        error.is_retryable() && attempt < self.max_attempts
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or
    /// exhausts the attempt budget. Exhaustion propagates the last error;
    /// the caller treats it as fatal for the batch.
    pub fn run<T>(
        &self,
        what: &str,
        mut op: impl FnMut() -> Result<T, FetchError>,
    ) -> Result<T, FetchError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op() {
                Ok(value) => return Ok(value),
                Err(error) if self.should_retry(&error, attempt) => {
                    warn!(
                        "{what}: attempt {attempt}/{} failed ({error}); retrying in {:?}",
                        self.max_attempts, self.interval
                    );
                    thread::sleep(self.interval);
                }
                Err(error) => return Err(error),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            interval: Duration::from_secs(10),
        }
    }
}
