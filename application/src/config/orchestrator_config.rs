//! OrchestratorConfig - container for every engine tunable.
//!
//! Infrastructure builds one from the merged TOML/env configuration; tests
//! build one with the `with_*` methods.

use super::ExecutionParams;
use conductor_domain::{CircuitConfig, HealthThresholds, RetryPolicy};
use std::time::Duration;

/// Bid collection parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct NegotiationParams {
    /// Collection window for bids; candidates silent past it are excluded.
    pub bid_timeout: Duration,
}

impl Default for NegotiationParams {
    fn default() -> Self {
        Self {
            bid_timeout: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrchestratorConfig {
    pub negotiation: NegotiationParams,
    pub execution: ExecutionParams,
    pub retry: RetryPolicy,
    pub circuit: CircuitConfig,
    pub health: HealthThresholds,
}

impl OrchestratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bid_timeout(mut self, timeout: Duration) -> Self {
        self.negotiation.bid_timeout = timeout;
        self
    }

    pub fn with_execution(mut self, execution: ExecutionParams) -> Self {
        self.execution = execution;
        self
    }

    pub fn with_assignment_timeout(mut self, timeout: Duration) -> Self {
        self.execution.assignment_timeout = timeout;
        self
    }

    pub fn with_orchestration_timeout(mut self, timeout: Duration) -> Self {
        self.execution.orchestration_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_circuit(mut self, circuit: CircuitConfig) -> Self {
        self.circuit = circuit;
        self
    }

    pub fn with_health(mut self, health: HealthThresholds) -> Self {
        self.health = health;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.negotiation.bid_timeout, Duration::from_secs(2));
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.circuit.failure_threshold, 3);
        assert_eq!(config.health.window, 20);
    }

    #[test]
    fn test_builder_chain() {
        let config = OrchestratorConfig::new()
            .with_bid_timeout(Duration::from_millis(100))
            .with_assignment_timeout(Duration::from_millis(250))
            .with_retry(RetryPolicy::new(5));

        assert_eq!(config.negotiation.bid_timeout, Duration::from_millis(100));
        assert_eq!(config.execution.assignment_timeout, Duration::from_millis(250));
        assert_eq!(config.retry.max_retries, 5);
    }
}
