use std::time::Duration;

/// Timing and retry settings for the driving loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay after the first failed connect attempt.
    pub connect_interval: Duration,
    /// Upper bound for the connect delay.
    pub max_connect_interval: Duration,
    /// Multiplier applied to the delay after each failed attempt.
    pub backoff_factor: u32,
    /// Failed attempts in a row before giving up. `None` waits forever.
    pub max_attempts: Option<u32>,
    /// Pause after a read that returned no data.
    pub idle_interval: Duration,
}

impl RetryPolicy {
    /// Retry every `interval`, forever.
    pub fn fixed(interval: Duration) -> Self {
        Self {
            connect_interval: interval,
            max_connect_interval: interval,
            backoff_factor: 1,
            ..Self::default()
        }
    }

    /// Give up after `attempts` failed connects in a row.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Delay after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let multiplier = self
            .backoff_factor
            .max(1)
            .checked_pow(exponent)
            .unwrap_or(u32::MAX);
        self.connect_interval
            .saturating_mul(multiplier)
            .min(self.max_connect_interval)
    }

    /// True once `attempts` failed attempts exhaust the budget.
    pub fn is_exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            connect_interval: Duration::from_millis(300),
            max_connect_interval: Duration::from_secs(2),
            backoff_factor: 2,
            max_attempts: None,
            idle_interval: Duration::from_millis(50),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_backoff_doubles_up_to_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(300));
        assert_eq!(policy.delay_for(2), Duration::from_millis(600));
        assert_eq!(policy.delay_for(3), Duration::from_millis(1200));
        assert_eq!(policy.delay_for(4), Duration::from_secs(2));
        assert_eq!(policy.delay_for(400), Duration::from_secs(2));
    }

    #[test]
    fn fixed_policy_never_grows() {
        let policy = RetryPolicy::fixed(Duration::from_millis(250));
        assert_eq!(policy.delay_for(1), Duration::from_millis(250));
        assert_eq!(policy.delay_for(50), Duration::from_millis(250));
    }

    #[test]
    fn zero_factor_behaves_like_fixed() {
        let policy = RetryPolicy {
            backoff_factor: 0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_for(5), Duration::from_millis(300));
    }

    #[test]
    fn waits_forever_by_default() {
        let policy = RetryPolicy::default();
        assert!(!policy.is_exhausted(u32::MAX));

        let bounded = policy.with_max_attempts(3);
        assert!(!bounded.is_exhausted(2));
        assert!(bounded.is_exhausted(3));
    }
}
