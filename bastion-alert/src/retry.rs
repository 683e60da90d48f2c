//! Retry schedule for alert delivery.

use std::time::Duration;

use rand::Rng;

use crate::{AlertConfig, AlertError};

/// How often and how long the publisher waits before resending an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    base: Duration,
    ceiling: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &AlertConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base: Duration::from_millis(config.base_backoff_ms),
            ceiling: Duration::from_millis(config.max_backoff_ms.max(config.base_backoff_ms)),
        }
    }

    /// Whether a send that failed with `error` on attempt `attempt` (0-based)
    /// should be tried again.
    pub fn should_retry(&self, error: &AlertError, attempt: u32) -> bool {
        error.is_transient() && attempt < self.max_retries
    }

    /// Wait before resend number `retry` (1-based).
    ///
    /// Starts at the base delay and doubles each time up to the ceiling. Up to
    /// a tenth is shaved off at random so publishers that failed together do
    /// not resend together.
    pub fn delay(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }

        let factor = 1u32.checked_shl(retry - 1).unwrap_or(u32::MAX);
        let nominal = self.base.saturating_mul(factor).min(self.ceiling);

        let spread = nominal / 10;
        if spread.is_zero() {
            return nominal;
        }
        nominal - spread.mul_f64(rand::rng().random::<f64>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(base_ms: u64, max_ms: u64) -> RetryPolicy {
        RetryPolicy::from_config(&AlertConfig::default().with_retries(3, base_ms, max_ms))
    }

    fn assert_between(delay: Duration, low_ms: u64, high_ms: u64) {
        assert!(
            delay >= Duration::from_millis(low_ms) && delay <= Duration::from_millis(high_ms),
            "{delay:?} not in {low_ms}..={high_ms}ms"
        );
    }

    #[test]
    fn test_delay_doubles_up_to_ceiling() {
        let policy = policy(100, 1_000);

        assert_eq!(policy.delay(0), Duration::ZERO);
        assert_between(policy.delay(1), 90, 100);
        assert_between(policy.delay(2), 180, 200);
        assert_between(policy.delay(3), 360, 400);
        assert_between(policy.delay(10), 900, 1_000);
        assert_between(policy.delay(u32::MAX), 900, 1_000);
    }

    #[test]
    fn test_ceiling_never_below_base() {
        assert_between(policy(500, 100).delay(1), 450, 500);
    }

    #[test]
    fn test_only_transient_errors_are_retried() {
        let policy = policy(1, 5);
        let transient = AlertError::TransportFailure("broker down".to_string());

        assert!(policy.should_retry(&transient, 0));
        assert!(policy.should_retry(&transient, 2));
        assert!(!policy.should_retry(&transient, 3));
        assert!(!policy.should_retry(&AlertError::Rejected(400), 0));
    }
}
