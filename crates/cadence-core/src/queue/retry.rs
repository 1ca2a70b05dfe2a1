//! Retry policy: decides backoff delays and the retry budget.

use std::time::Duration;

/// Host-side retry policy for tasks that report `Retry`.
///
/// Defaults follow what mobile job schedulers do: 30s exponential backoff
/// capped at 5h, no attempt limit.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Base delay for the first retry.
    pub base_delay: Duration,

    /// Backoff multiplier for exponential backoff.
    pub multiplier: f64,

    /// Upper bound for a single backoff.
    pub max_delay: Duration,

    /// Total attempts allowed (first run included). `None` = unlimited.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(30),
            multiplier: 2.0,
            max_delay: Duration::from_secs(5 * 60 * 60),
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Calculate delay for the next retry based on attempt number.
    ///
    /// `attempts` is the number of attempts already made (1-indexed).
    /// delay = min(base_delay * multiplier^(attempts - 1), max_delay)
    ///
    /// Example with the defaults:
    /// - attempt 1 (first failure): 30s
    /// - attempt 2: 60s
    /// - attempt 3: 120s
    /// - attempt 10: capped at 5h
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay_secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if !delay_secs.is_finite() || delay_secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(delay_secs)
    }

    /// May a task that has made `attempts` attempts be tried again?
    pub fn allows_retry(&self, attempts: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempts < max)
    }
}
