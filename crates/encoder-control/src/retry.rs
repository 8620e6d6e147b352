//! Fixed-delay retry for device commands.
//!
//! The appliance answers 503 while it is still applying a previous
//! command. Those are retried after a constant delay; anything else is
//! returned to the caller straight away.

use crate::errors::{EncoderError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default delay before each retry.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay,
        }
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or
    /// the retry budget is spent.
    ///
    /// At most `1 + max_retries` attempts are made, sleeping `retry_delay`
    /// before each retry.
    ///
    /// # Arguments
    ///
    /// * `label` - Request path, used in logs and in the exhaustion error
    /// * `op` - Produces one attempt
    /// * `is_retryable` - Classifies a failed attempt
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error unchanged, or
    /// `EncoderError::MaxRetriesExceeded` once every attempt was retryable.
    pub async fn run<T, F, Fut, R>(&self, label: &str, mut op: F, is_retryable: R) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        R: Fn(&EncoderError) -> bool,
    {
        let mut retries = 0u32;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if !is_retryable(&e) => return Err(e),
                Err(e) => {
                    if retries >= self.max_retries {
                        return Err(EncoderError::MaxRetriesExceeded {
                            path: label.to_string(),
                            max_retries: self.max_retries,
                        });
                    }
                    retries += 1;

                    warn!(
                        target: "encoder.transport",
                        path = %label,
                        error = %e,
                        attempt = retries,
                        max_retries = self.max_retries,
                        delay_ms = u64::try_from(self.retry_delay.as_millis()).unwrap_or(u64::MAX),
                        "Device busy, retrying"
                    );

                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }
}
