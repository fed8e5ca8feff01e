//! Retry support for transient checkout failures.
//!
//! A lock wait, serialization conflict, or dropped connection rolls the
//! transaction back cleanly; the order can simply be resubmitted. This module
//! gives callers an exponential-backoff loop that retries exactly those
//! failures — validation failures and other permanent errors surface
//! immediately.

#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use ordercore::errors::CheckoutError;

/// Retry strategy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryStrategy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Base delay between attempts.
    pub base_delay: Duration,
    /// Maximum delay (exponential backoff cap).
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to prevent thundering herd.
    pub use_jitter: bool,
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            use_jitter: true,
        }
    }
}

impl RetryStrategy {
    /// A patient strategy for contended catalogs.
    pub const fn patient() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 1.5,
            use_jitter: true,
        }
    }

    /// A strategy that gives up quickly, for latency-sensitive callers.
    pub const fn impatient() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(2),
            backoff_multiplier: 3.0,
            use_jitter: false,
        }
    }

    /// Calculate the delay before a given attempt number.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let delay_ms =
            self.base_delay.as_millis() as f64 * self.backoff_multiplier.powi((attempt - 1) as i32);
        let capped = std::cmp::min(Duration::from_millis(delay_ms as u64), self.max_delay);

        if self.use_jitter {
            add_jitter(capped)
        } else {
            capped
        }
    }
}

fn add_jitter(delay: Duration) -> Duration {
    use rand::Rng;
    let jitter_factor = rand::rng().random_range(0.8..1.2);
    let jittered_ms = (delay.as_millis() as f64 * jitter_factor) as u64;
    Duration::from_millis(jittered_ms)
}

/// Errors from the retry loop.
#[derive(Debug, Error)]
pub enum RetryError {
    /// Every attempt failed with a transient error.
    #[error("all {attempts} attempts exhausted; last error: {last_error}")]
    ExhaustedAttempts {
        /// Number of attempts made.
        attempts: u32,
        /// The last transient error encountered.
        last_error: CheckoutError,
    },

    /// A non-transient error surfaced; retrying would not help.
    #[error("non-retryable error: {0}")]
    NonRetryable(CheckoutError),
}

impl From<RetryError> for CheckoutError {
    fn from(error: RetryError) -> Self {
        match error {
            RetryError::ExhaustedAttempts { last_error, .. }
            | RetryError::NonRetryable(last_error) => last_error,
        }
    }
}

/// Run a checkout operation, retrying transient failures with backoff.
///
/// The operation closure is invoked once per attempt; each attempt runs a
/// fresh transaction against fresh locked state. Validation failures are
/// permanent for unchanged stock and are never retried.
pub async fn retry_checkout<F, Fut, T>(
    strategy: &RetryStrategy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CheckoutError>>,
{
    let mut last_error = None;

    for attempt in 0..strategy.max_attempts {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        "operation succeeded after retries"
                    );
                }
                return Ok(result);
            }
            Err(error) => {
                if !error.is_transient() {
                    return Err(RetryError::NonRetryable(error));
                }

                if attempt < strategy.max_attempts - 1 {
                    let delay = strategy.calculate_delay(attempt + 1);
                    warn!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        ?delay,
                        error = %error,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                last_error = Some(error);
            }
        }
    }

    let last_error = last_error.unwrap_or_else(|| {
        CheckoutError::Internal("retry loop ran zero attempts".to_owned())
    });
    Err(RetryError::ExhaustedAttempts {
        attempts: strategy.max_attempts,
        last_error,
    })
}
