//! Circuit breaker
//!
//! Time is passed in explicitly so the breaker stays a pure state machine.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Circuit state of one agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    #[default]
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// Time an open circuit waits before allowing a trial
    #[serde(with = "crate::serde_millis")]
    pub cool_down: Duration,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cool_down: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CircuitBreaker {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// State as of `now`, reporting an open circuit whose cool-down has
    /// elapsed as half-open. Does not change the breaker.
    pub fn state_at(&self, now: Instant, config: &CircuitConfig) -> CircuitState {
        match self.state {
            CircuitState::Open if self.cooled_down(now, config) => CircuitState::HalfOpen,
            state => state,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn opened_at(&self) -> Option<Instant> {
        self.opened_at
    }

    fn cooled_down(&self, now: Instant, config: &CircuitConfig) -> bool {
        self.opened_at
            .is_some_and(|opened| now.saturating_duration_since(opened) >= config.cool_down)
    }

    /// Whether an assignment could be granted right now, without taking the
    /// half-open trial permit.
    pub fn can_assign(&self, now: Instant, config: &CircuitConfig) -> bool {
        match self.state_at(now, config) {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => !self.trial_in_flight,
        }
    }

    /// Grants an assignment. In half-open state exactly one trial is granted
    /// until its outcome is recorded.
    pub fn allow(&mut self, now: Instant, config: &CircuitConfig) -> bool {
        if self.state == CircuitState::Open && self.cooled_down(now, config) {
            self.state = CircuitState::HalfOpen;
            self.trial_in_flight = false;
        }
        match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => {
                if self.trial_in_flight {
                    false
                } else {
                    self.trial_in_flight = true;
                    true
                }
            }
        }
    }

    /// Returns a trial permit whose assignment ended without an agent
    /// outcome (e.g. cancellation).
    pub fn release(&mut self) {
        self.trial_in_flight = false;
    }

    pub fn record_success(&mut self) {
        self.state = CircuitState::Closed;
        self.consecutive_failures = 0;
        self.opened_at = None;
        self.trial_in_flight = false;
    }

    /// Records a failure and returns the resulting state.
    pub fn record_failure(&mut self, now: Instant, config: &CircuitConfig) -> CircuitState {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.trial_in_flight = false;
        match self.state {
            CircuitState::HalfOpen => self.open(now),
            CircuitState::Closed if self.consecutive_failures >= config.failure_threshold => {
                self.open(now)
            }
            _ => {}
        }
        self.state
    }

    fn open(&mut self, now: Instant) {
        self.state = CircuitState::Open;
        self.opened_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CircuitConfig {
        CircuitConfig {
            failure_threshold: 3,
            cool_down: Duration::from_secs(10),
        }
    }

    #[test]
    fn test_opens_after_exactly_threshold_failures() {
        let cfg = config();
        let now = Instant::now();
        let mut breaker = CircuitBreaker::new();

        assert_eq!(breaker.record_failure(now, &cfg), CircuitState::Closed);
        assert_eq!(breaker.record_failure(now, &cfg), CircuitState::Closed);
        assert!(breaker.allow(now, &cfg));
        assert_eq!(breaker.record_failure(now, &cfg), CircuitState::Open);
        assert_eq!(breaker.opened_at(), Some(now));
    }

    #[test]
    fn test_open_circuit_rejects_until_cool_down() {
        let cfg = config();
        let now = Instant::now();
        let mut breaker = CircuitBreaker::new();
        for _ in 0..3 {
            breaker.record_failure(now, &cfg);
        }

        assert!(!breaker.can_assign(now, &cfg));
        assert!(!breaker.allow(now + Duration::from_secs(9), &cfg));
        assert_eq!(breaker.state_at(now + Duration::from_secs(9), &cfg), CircuitState::Open);
        assert_eq!(breaker.state_at(now + Duration::from_secs(10), &cfg), CircuitState::HalfOpen);
    }

    #[test]
    fn test_half_open_grants_exactly_one_trial() {
        let cfg = config();
        let now = Instant::now();
        let mut breaker = CircuitBreaker::new();
        for _ in 0..3 {
            breaker.record_failure(now, &cfg);
        }
        let later = now + Duration::from_secs(11);

        assert!(breaker.can_assign(later, &cfg));
        assert!(breaker.allow(later, &cfg));
        assert!(!breaker.can_assign(later, &cfg));
        assert!(!breaker.allow(later, &cfg));
    }

    #[test]
    fn test_trial_success_closes() {
        let cfg = config();
        let now = Instant::now();
        let mut breaker = CircuitBreaker::new();
        for _ in 0..3 {
            breaker.record_failure(now, &cfg);
        }
        let later = now + Duration::from_secs(11);
        assert!(breaker.allow(later, &cfg));
        breaker.record_success();

        assert_eq!(breaker.state_at(later, &cfg), CircuitState::Closed);
        assert_eq!(breaker.consecutive_failures(), 0);
        assert!(breaker.allow(later, &cfg));
        assert!(breaker.allow(later, &cfg));
    }

    #[test]
    fn test_trial_failure_reopens() {
        let cfg = config();
        let now = Instant::now();
        let mut breaker = CircuitBreaker::new();
        for _ in 0..3 {
            breaker.record_failure(now, &cfg);
        }
        let later = now + Duration::from_secs(11);
        assert!(breaker.allow(later, &cfg));

        assert_eq!(breaker.record_failure(later, &cfg), CircuitState::Open);
        assert_eq!(breaker.opened_at(), Some(later));
        assert!(!breaker.allow(later + Duration::from_secs(5), &cfg));
    }

    #[test]
    fn test_release_returns_trial_permit() {
        let cfg = config();
        let now = Instant::now();
        let mut breaker = CircuitBreaker::new();
        for _ in 0..3 {
            breaker.record_failure(now, &cfg);
        }
        let later = now + Duration::from_secs(11);
        assert!(breaker.allow(later, &cfg));
        breaker.release();
        assert!(breaker.allow(later, &cfg));
    }

    #[test]
    fn test_success_resets_failure_count() {
        let cfg = config();
        let now = Instant::now();
        let mut breaker = CircuitBreaker::new();
        breaker.record_failure(now, &cfg);
        breaker.record_failure(now, &cfg);
        breaker.record_success();
        breaker.record_failure(now, &cfg);
        assert_eq!(breaker.state_at(now, &cfg), CircuitState::Closed);
    }
}
