//! Retry utilities with exponential backoff for resilient API calls.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::error::ArxivError;

/// Longest single sleep between two attempts
pub const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Total number of attempts, the first one included
    pub max_retries: u32,
    /// Exponential backoff base
    pub backoff_base: f64,
    /// Length of one backoff step; the delay after attempt `n` (zero-based)
    /// is `backoff_base^n` of these
    pub backoff_unit: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: 2.0,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, backoff_base: f64) -> Self {
        Self {
            max_retries,
            backoff_base,
            ..Default::default()
        }
    }

    /// Override the backoff step, mostly useful to make tests fast
    pub fn backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Delay to wait after the zero-based `attempt` failed, at most [`MAX_BACKOFF`]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let factor = self.backoff_base.max(1.0).powi(exponent);
        Duration::try_from_secs_f64(self.backoff_unit.as_secs_f64() * factor)
            .map_or(MAX_BACKOFF, |delay| delay.min(MAX_BACKOFF))
    }

    fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }
}

/// Execute an async operation with retry logic
///
/// Transient failures ([`ArxivError::is_transient`]) are retried until
/// `max_retries` attempts have been made, sleeping with exponential backoff
/// in between. Any other error is returned immediately. When every attempt
/// fails, the returned `Network` error carries the last failure.
pub async fn with_retry<T, F, Fut>(config: RetryConfig, operation: F) -> Result<T, ArxivError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ArxivError>>,
{
    let mut operation = operation;
    let attempts = config.attempts();
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(
                        attempt = attempt + 1,
                        "Operation succeeded after {} transient failures",
                        attempt
                    );
                }
                return Ok(value);
            }
            Err(error) if !error.is_transient() => return Err(error),
            Err(error) => {
                if attempt + 1 >= attempts {
                    tracing::warn!(attempts, error = %error, "Giving up after retries");
                    let last = match error {
                        ArxivError::Network(message) => message,
                        other => other.to_string(),
                    };
                    return Err(ArxivError::Network(format!(
                        "failed after {} attempts: {}",
                        attempts, last
                    )));
                }

                let delay = config.delay_for(attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    max_attempts = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Transient error, retrying"
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
