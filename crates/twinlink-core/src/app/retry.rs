//! Retry policy: decides whether and when a failed command is resubmitted.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::config::duration_ms;
use crate::domain::{CorrelationError, ValidationError};

/// Upper bound for a single backoff delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Retry policy for failed management commands.
///
/// Only retryable failures (timeouts, dispatch failures) are retried; a remote
/// rejection or a cancellation is returned to the caller as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one. `1` disables retries.
    pub max_attempts: u32,

    /// Base delay for the first retry.
    #[serde(rename = "base_delay_ms", with = "duration_ms")]
    pub base_delay: Duration,

    /// Backoff multiplier for exponential backoff.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::from_millis(200),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.multiplier.is_finite() || self.multiplier < 0.0 {
            return Err(ValidationError::InvalidRetryMultiplier);
        }
        Ok(())
    }

    /// `base_delay * multiplier^(attempts - 1)`, saturated to [`MAX_BACKOFF`].
    ///
    /// Example with base_delay=200ms, multiplier=2.0:
    /// - attempt 1 (first failure): 200ms
    /// - attempt 2: 400ms
    /// - attempt 3: 800ms
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let exponent = i32::try_from(attempts.saturating_sub(1)).unwrap_or(i32::MAX);
        let delay_secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        match Duration::try_from_secs_f64(delay_secs) {
            Ok(delay) => delay.min(MAX_BACKOFF),
            Err(_) if delay_secs < 0.0 => Duration::ZERO,
            // overflow or NaN
            Err(_) => MAX_BACKOFF,
        }
    }

    /// `attempts` is the number of attempts already made (1-indexed).
    pub fn should_retry(&self, attempts: u32, err: &CorrelationError) -> bool {
        attempts < self.max_attempts && err.is_retryable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TransportError;
    use rstest::rstest;

    #[test]
    fn default_policy_does_not_retry() {
        let policy = RetryPolicy::default();
        let timeout = CorrelationError::Timeout { after: Duration::from_secs(1) };
        assert!(!policy.should_retry(1, &timeout));
    }

    #[test]
    fn exponential_backoff_increases() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.next_delay(1), Duration::from_millis(200));
        assert_eq!(policy.next_delay(2), Duration::from_millis(400));
        assert_eq!(policy.next_delay(3), Duration::from_millis(800));
    }

    #[test]
    fn only_retryable_errors_are_retried() {
        let policy = RetryPolicy::default().with_max_attempts(3);

        assert!(policy.should_retry(1, &CorrelationError::Dispatch(TransportError::Closed)));
        let timeout = CorrelationError::Timeout { after: Duration::from_secs(1) };
        assert!(policy.should_retry(2, &timeout));
        assert!(!policy.should_retry(3, &timeout));
        assert!(!policy.should_retry(1, &CorrelationError::remote("not-found")));
        assert!(!policy.should_retry(1, &CorrelationError::Cancelled));
    }

    #[rstest]
    #[case::huge_attempt(2.0, u32::MAX, MAX_BACKOFF)]
    #[case::past_cap(2.0, 20, MAX_BACKOFF)]
    #[case::negative_odd_power(-1.0, 2, Duration::ZERO)]
    #[case::negative_even_power(-1.0, 3, Duration::from_millis(200))]
    #[case::infinite(f64::INFINITY, 2, MAX_BACKOFF)]
    #[case::nan(f64::NAN, 2, MAX_BACKOFF)]
    fn next_delay_saturates_instead_of_panicking(
        #[case] multiplier: f64,
        #[case] attempts: u32,
        #[case] expected: Duration,
    ) {
        let policy = RetryPolicy { multiplier, ..RetryPolicy::default() };
        assert_eq!(policy.next_delay(attempts), expected);
    }

    #[rstest]
    #[case::negative(-1.0)]
    #[case::infinite(f64::INFINITY)]
    #[case::nan(f64::NAN)]
    fn unusable_multiplier_is_invalid(#[case] multiplier: f64) {
        let policy = RetryPolicy { multiplier, ..RetryPolicy::default() };
        assert_eq!(policy.validate(), Err(ValidationError::InvalidRetryMultiplier));
    }

    #[test]
    fn default_policy_is_valid() {
        assert_eq!(RetryPolicy::default().validate(), Ok(()));
    }
}
