//! What a stream does after a failed round.
//!
//! Every round of a poller ends in `Ok(items)` or `Err(CoreError)`. Errors are
//! handed to a [`PollPolicy`], which answers with a [`RetryStrategy`]: wait the
//! usual interval, wait a specific delay, or stop the stream.

use redstream_core::{CoreError, ErrorExt};
use std::time::Duration;

/// Backoff settings used when a policy opts into exponential delays.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Base delay for exponential backoff (in milliseconds)
    pub base_delay_ms: u64,
    /// Maximum delay between retries (in milliseconds)
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Maximum jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_delay_ms: 30000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryConfig {
    /// Create retry config optimized for Reddit API
    pub fn reddit() -> Self {
        Self {
            base_delay_ms: 2000,
            max_delay_ms: 60000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.2, // spread concurrent streams apart
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RetryStrategy {
    /// Try again after the stream's regular poll interval.
    Retry,
    /// Try again after the given delay.
    RetryWithDelay(Duration),
    /// Stop the stream.
    NoRetry,
}

/// Classifies a round failure independent of any policy knobs, using the
/// error's own `is_retryable` and `retry_after`.
pub fn get_retry_strategy(error: &CoreError) -> RetryStrategy {
    if !error.is_retryable() {
        return RetryStrategy::NoRetry;
    }
    match error.retry_after() {
        Some(delay) => RetryStrategy::RetryWithDelay(delay),
        None => RetryStrategy::Retry,
    }
}

/// Calculate delay with exponential backoff and jitter
pub fn calculate_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let max_delay = Duration::from_millis(config.max_delay_ms);

    let exponential_delay = if attempt == 0 {
        Duration::from_millis(config.base_delay_ms)
    } else {
        let multiplier = config.backoff_multiplier.powi(attempt as i32);
        let delay_ms = (config.base_delay_ms as f64 * multiplier) as u64;
        Duration::from_millis(delay_ms.min(config.max_delay_ms))
    };

    let jitter_range = (exponential_delay.as_millis() as f64 * config.jitter_factor) as u64;
    let jitter = fastrand::u64(0..=jitter_range);
    let final_delay = exponential_delay + Duration::from_millis(jitter);

    final_delay.min(max_delay)
}

/// Failure policy for one stream.
#[derive(Debug, Clone, Default)]
pub struct PollPolicy {
    backoff: Option<RetryConfig>,
    max_consecutive_failures: Option<u32>,
}

impl PollPolicy {
    /// Never gives up: a failed round counts as an empty one.
    pub fn liveness() -> Self {
        Self::default()
    }

    /// Replace the plain poll interval with exponential backoff while failing.
    pub fn with_backoff(mut self, config: RetryConfig) -> Self {
        self.backoff = Some(config);
        self
    }

    /// Stop the stream after `limit` failed rounds in a row.
    pub fn with_max_consecutive_failures(mut self, limit: u32) -> Self {
        self.max_consecutive_failures = Some(limit);
        self
    }

    /// `consecutive_failures` includes the failure being decided on.
    pub fn decide(&self, error: &CoreError, consecutive_failures: u32) -> RetryStrategy {
        if let Some(limit) = self.max_consecutive_failures {
            if consecutive_failures >= limit {
                return RetryStrategy::NoRetry;
            }
        }

        match get_retry_strategy(error) {
            RetryStrategy::Retry => match &self.backoff {
                Some(config) => RetryStrategy::RetryWithDelay(calculate_delay(
                    consecutive_failures.saturating_sub(1),
                    config,
                )),
                None => RetryStrategy::Retry,
            },
            other => other,
        }
    }
}
