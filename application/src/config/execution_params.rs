//! Execution parameters - assignment and orchestration control.
//!
//! [`ExecutionParams`] groups the static parameters the supervisor uses while
//! an assignment is running. These are application-layer concerns, not
//! domain policy.

use std::time::Duration;

/// Assignment and orchestration control parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionParams {
    /// How long the supervisor waits for an assignee's terminal reply.
    pub assignment_timeout: Duration,
    /// Wall-clock bound on one orchestration; exceeding it force-fails the instance.
    pub orchestration_timeout: Duration,
    /// Load added to an agent when an assignment starts and removed when it ends.
    pub load_step: f64,
    /// Weight of the latest outcome in the success-rate moving average.
    pub success_rate_alpha: f64,
}

impl Default for ExecutionParams {
    fn default() -> Self {
        Self {
            assignment_timeout: Duration::from_secs(30),
            orchestration_timeout: Duration::from_secs(300),
            load_step: 0.25,
            success_rate_alpha: 0.2,
        }
    }
}

impl ExecutionParams {
    // ==================== Builder Methods ====================

    pub fn with_assignment_timeout(mut self, timeout: Duration) -> Self {
        self.assignment_timeout = timeout;
        self
    }

    pub fn with_orchestration_timeout(mut self, timeout: Duration) -> Self {
        self.orchestration_timeout = timeout;
        self
    }

    pub fn with_load_step(mut self, step: f64) -> Self {
        self.load_step = step;
        self
    }

    pub fn with_success_rate_alpha(mut self, alpha: f64) -> Self {
        self.success_rate_alpha = alpha;
        self
    }
}
