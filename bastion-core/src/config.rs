//! Throttling configuration.

use chrono::Duration;

/// Configuration for per-username attempt throttling.
///
/// # Defaults
///
/// - enabled
/// - 5 failed attempts before lockout
/// - 15 minute lockout, counted from the last recorded failure. Blocked
///   attempts are not recorded, so this is the failure that crossed the
///   threshold unless a concurrent failure was counted just after it.
/// - attempt records expire after the same period of inactivity
/// - expired records are swept every 60 seconds
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    pub enabled: bool,
    /// Failure count at which a username becomes blocked. Values below 1 are treated as 1.
    pub max_failed_attempts: u32,
    pub lockout_period: Duration,
    /// Idle time after which an attempt record is evicted.
    pub record_ttl: Duration,
    pub sweep_interval: std::time::Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_failed_attempts: 5,
            lockout_period: Duration::minutes(15),
            record_ttl: Duration::minutes(15),
            sweep_interval: std::time::Duration::from_secs(60),
        }
    }
}

impl ThrottleConfig {
    /// Verification only: nothing is counted and nobody is blocked.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_max_failed_attempts(mut self, max_failed_attempts: u32) -> Self {
        self.max_failed_attempts = max_failed_attempts;
        self
    }

    /// Set the lockout period. The record TTL follows it.
    pub fn with_lockout_period(mut self, lockout_period: Duration) -> Self {
        self.lockout_period = lockout_period;
        self.record_ttl = lockout_period;
        self
    }

    pub fn with_record_ttl(mut self, record_ttl: Duration) -> Self {
        self.record_ttl = record_ttl;
        self
    }

    pub fn threshold(&self) -> u32 {
        self.max_failed_attempts.max(1)
    }

    /// TTL stores should apply. Never shorter than the lockout period, so
    /// eviction cannot end a lockout early.
    pub fn effective_record_ttl(&self) -> Duration {
        self.record_ttl.max(self.lockout_period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ThrottleConfig::default();
        assert!(config.enabled);
        assert_eq!(config.threshold(), 5);
        assert_eq!(config.lockout_period, Duration::minutes(15));
        assert_eq!(config.effective_record_ttl(), Duration::minutes(15));
    }

    #[test]
    fn test_threshold_is_at_least_one() {
        let config = ThrottleConfig::default().with_max_failed_attempts(0);
        assert_eq!(config.threshold(), 1);
    }

    #[test]
    fn test_record_ttl_never_shorter_than_lockout() {
        let config = ThrottleConfig::default()
            .with_lockout_period(Duration::minutes(30))
            .with_record_ttl(Duration::minutes(5));
        assert_eq!(config.effective_record_ttl(), Duration::minutes(30));

        let config = ThrottleConfig::default().with_record_ttl(Duration::hours(1));
        assert_eq!(config.effective_record_ttl(), Duration::hours(1));
    }

    #[test]
    fn test_disabled() {
        assert!(!ThrottleConfig::disabled().enabled);
    }
}
