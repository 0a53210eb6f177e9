//! Rolling outcome window

use crate::agent::descriptor::AgentStatus;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Result of one assignment, as seen by the health monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Error,
    Timeout,
}

/// Scoring weights and status thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthThresholds {
    /// Number of most recent outcomes kept per agent
    pub window: usize,
    /// Scores at or above this are `available`
    pub available_above: f64,
    /// Scores below this are `offline`
    pub offline_below: f64,
    /// Consecutive failures that force `offline` regardless of score
    pub max_consecutive_failures: u32,
    pub error_weight: f64,
    pub timeout_weight: f64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            window: 20,
            available_above: 0.8,
            offline_below: 0.4,
            max_consecutive_failures: 5,
            error_weight: 0.6,
            timeout_weight: 0.4,
        }
    }
}

/// Snapshot of an agent's health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub score: f64,
    pub status: AgentStatus,
    pub successes: usize,
    pub errors: usize,
    pub timeouts: usize,
    pub consecutive_failures: u32,
}

/// The last `window` outcomes of one agent.
#[derive(Debug, Clone, Default)]
pub struct HealthWindow {
    outcomes: VecDeque<Outcome>,
    consecutive_failures: u32,
}

impl HealthWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: Outcome, thresholds: &HealthThresholds) {
        self.outcomes.push_back(outcome);
        while self.outcomes.len() > thresholds.window.max(1) {
            self.outcomes.pop_front();
        }
        match outcome {
            Outcome::Success => self.consecutive_failures = 0,
            Outcome::Error | Outcome::Timeout => self.consecutive_failures += 1,
        }
    }

    fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.iter().filter(|o| **o == outcome).count()
    }

    fn rate(&self, outcome: Outcome) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        self.count(outcome) as f64 / self.outcomes.len() as f64
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// `1 − (error_weight·error_rate + timeout_weight·timeout_rate)`, clamped
    /// to `[0, 1]`. An empty window scores 1.0.
    pub fn score(&self, thresholds: &HealthThresholds) -> f64 {
        let penalty = thresholds.error_weight * self.rate(Outcome::Error)
            + thresholds.timeout_weight * self.rate(Outcome::Timeout);
        (1.0 - penalty).clamp(0.0, 1.0)
    }

    pub fn status(&self, thresholds: &HealthThresholds) -> AgentStatus {
        let score = self.score(thresholds);
        if self.consecutive_failures >= thresholds.max_consecutive_failures
            || score < thresholds.offline_below
        {
            AgentStatus::Offline
        } else if score >= thresholds.available_above {
            AgentStatus::Available
        } else {
            AgentStatus::Degraded
        }
    }

    pub fn report(&self, thresholds: &HealthThresholds) -> HealthReport {
        HealthReport {
            score: self.score(thresholds),
            status: self.status(thresholds),
            successes: self.count(Outcome::Success),
            errors: self.count(Outcome::Error),
            timeouts: self.count(Outcome::Timeout),
            consecutive_failures: self.consecutive_failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window_of(outcomes: &[Outcome], thresholds: &HealthThresholds) -> HealthWindow {
        let mut window = HealthWindow::new();
        for outcome in outcomes {
            window.record(*outcome, thresholds);
        }
        window
    }

    #[test]
    fn test_empty_window_is_healthy() {
        let t = HealthThresholds::default();
        let window = HealthWindow::new();
        assert_eq!(window.score(&t), 1.0);
        assert_eq!(window.status(&t), AgentStatus::Available);
    }

    #[test]
    fn test_weighted_score() {
        let t = HealthThresholds::default();
        // 1 error, 1 timeout, 2 successes: 1 - (0.6*0.25 + 0.4*0.25) = 0.75
        let window = window_of(
            &[Outcome::Success, Outcome::Error, Outcome::Timeout, Outcome::Success],
            &t,
        );
        assert!((window.score(&t) - 0.75).abs() < 1e-9);
        assert_eq!(window.status(&t), AgentStatus::Degraded);
    }

    #[test]
    fn test_consecutive_failures_force_offline() {
        let t = HealthThresholds {
            max_consecutive_failures: 3,
            ..Default::default()
        };
        let mut outcomes = vec![Outcome::Success; 17];
        outcomes.extend([Outcome::Timeout, Outcome::Timeout, Outcome::Timeout]);
        let window = window_of(&outcomes, &t);

        assert!(window.score(&t) > t.available_above);
        assert_eq!(window.status(&t), AgentStatus::Offline);
    }

    #[test]
    fn test_success_resets_consecutive_failures() {
        let t = HealthThresholds::default();
        let window = window_of(&[Outcome::Error, Outcome::Error, Outcome::Success], &t);
        assert_eq!(window.consecutive_failures(), 0);
    }

    #[test]
    fn test_window_is_bounded() {
        let t = HealthThresholds {
            window: 3,
            ..Default::default()
        };
        let window = window_of(
            &[Outcome::Error, Outcome::Error, Outcome::Success, Outcome::Success, Outcome::Success],
            &t,
        );
        assert_eq!(window.len(), 3);
        let report = window.report(&t);
        assert_eq!(report.errors, 0);
        assert_eq!(report.successes, 3);
        assert_eq!(report.status, AgentStatus::Available);
    }

    #[test]
    fn test_low_score_is_offline() {
        let t = HealthThresholds {
            max_consecutive_failures: 100,
            ..Default::default()
        };
        let window = window_of(&[Outcome::Error, Outcome::Error, Outcome::Success], &t);
        // 1 - 0.6 * 2/3 = 0.6 -> degraded
        assert_eq!(window.status(&t), AgentStatus::Degraded);
        let window = window_of(&[Outcome::Error, Outcome::Error, Outcome::Error, Outcome::Success], &t);
        // 1 - 0.6 * 0.75 = 0.55 -> degraded
        assert_eq!(window.status(&t), AgentStatus::Degraded);
        let window = window_of(&[Outcome::Error; 4], &t);
        // 1 - 0.6 = 0.4 -> not below the floor
        assert_eq!(window.status(&t), AgentStatus::Degraded);
        let t = HealthThresholds {
            error_weight: 0.8,
            ..t
        };
        assert_eq!(window.status(&t), AgentStatus::Offline);
    }
}
