use std::future::Future;
use std::time::Duration;

use tracing::warn;

use optivault_store::StoreError;

use crate::config::BackupConfig;

/// Strategy for computing delay between retries of a store call.
///
/// All variants clamp the computed delay so it never exceeds the configured
/// maximum.
#[derive(Debug, Clone)]
pub enum RetryStrategy {
    /// Exponential backoff: `base * multiplier^attempt`, optionally with
    /// deterministic jitter.
    Exponential {
        /// Initial delay before the first retry.
        base: Duration,
        /// Upper bound on the computed delay.
        max: Duration,
        /// Factor applied on each successive attempt.
        multiplier: f64,
        /// Spread concurrent retries by +0% to +40% depending on the attempt.
        jitter: bool,
    },
    /// Constant delay between every retry attempt.
    Constant {
        /// Fixed delay duration.
        delay: Duration,
    },
}

impl RetryStrategy {
    /// Compute the delay duration for the given zero-based `attempt` number.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use optivault_backup::RetryStrategy;
    ///
    /// let strategy = RetryStrategy::Constant { delay: Duration::from_secs(1) };
    /// assert_eq!(strategy.delay_for(0), Duration::from_secs(1));
    /// assert_eq!(strategy.delay_for(5), Duration::from_secs(1));
    /// ```
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            Self::Exponential {
                base,
                max,
                multiplier,
                jitter,
            } => {
                // Retry counts are small, so the cast cannot wrap.
                #[allow(clippy::cast_possible_wrap)]
                let raw = base.as_secs_f64() * multiplier.powi(attempt as i32);

                let adjusted = if *jitter {
                    raw * (1.0 + 0.1 * f64::from(attempt % 5))
                } else {
                    raw
                };

                Duration::from_secs_f64(adjusted.min(max.as_secs_f64()))
            }
            Self::Constant { delay } => *delay,
        }
    }
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(200),
            max: Duration::from_secs(5),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Run a store call with a per-attempt timeout, retrying transient failures.
///
/// Timeouts and errors for which [`StoreError::is_retryable`] holds are
/// retried up to [`BackupConfig::max_retries`] times. Any other error is
/// returned immediately.
pub(crate) async fn with_retry<T, F, Fut>(
    config: &BackupConfig,
    operation: &str,
    mut call: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut attempt = 0;
    loop {
        let err = match tokio::time::timeout(config.store_timeout, call()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(err)) => err,
            Err(_elapsed) => StoreError::Timeout(config.store_timeout),
        };

        if !err.is_retryable() || attempt >= config.max_retries {
            return Err(err);
        }

        let delay = config.retry_strategy.delay_for(attempt);
        warn!(
            operation,
            attempt,
            error = %err,
            delay_ms = %delay.as_millis(),
            "transient store error, will retry"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
