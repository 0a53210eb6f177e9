//! Retry budget and exponential backoff

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry budget per assignee plus the backoff curve between attempts.
///
/// `max_retries` is the number of failed attempts charged against one
/// assignee before the orchestration falls back to another candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    #[serde(with = "crate::serde_millis")]
    pub base: Duration,
    pub factor: f64,
    #[serde(with = "crate::serde_millis")]
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base: Duration::from_millis(200),
            factor: 2.0,
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    pub fn with_base(mut self, base: Duration) -> Self {
        self.base = base;
        self
    }

    pub fn with_factor(mut self, factor: f64) -> Self {
        self.factor = factor;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Whether another attempt on the same agent is allowed after
    /// `failures` failed attempts.
    pub fn allows_retry(&self, failures: u32) -> bool {
        failures < self.max_retries
    }

    /// `min(base × factor^attempt, max_delay)`, `attempt` counting from 0.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.base.as_secs_f64() * self.factor.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 2);
        assert!(policy.allows_retry(1));
        assert!(!policy.allows_retry(2));
    }

    #[test]
    fn test_exponential_delay() {
        let policy = RetryPolicy::new(5)
            .with_base(Duration::from_millis(100))
            .with_factor(2.0)
            .with_max_delay(Duration::from_secs(1));

        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for(3), Duration::from_millis(800));
        assert_eq!(policy.delay_for(4), Duration::from_secs(1));
        assert_eq!(policy.delay_for(60), Duration::from_secs(1));
    }

    #[test]
    fn test_zero_budget_never_retries() {
        assert!(!RetryPolicy::new(0).allows_retry(0));
    }
}
