//! Self-healing controller
//!
//! The single place where retry, circuit breaking and fallback are decided
//! after a failed assignment. Picking the fallback agent itself is left to
//! the supervisor, which owns the ranking.

use super::circuit_table::CircuitTable;
use conductor_domain::{AgentId, CircuitState, OrchestrationError, RecoveryDecision, RetryPolicy};
use std::sync::Arc;
use tracing::debug;

pub struct SelfHealingController {
    circuits: Arc<CircuitTable>,
    retry: RetryPolicy,
}

impl SelfHealingController {
    pub fn new(circuits: Arc<CircuitTable>, retry: RetryPolicy) -> Self {
        Self { circuits, retry }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Decides how to recover from `failure` on `agent_id`.
    ///
    /// `failures` is the number of failed attempts charged against this
    /// assignee so far, including this one. Agent faults are recorded
    /// against the circuit first; an open circuit always falls back.
    pub async fn decide(
        &self,
        agent_id: &AgentId,
        failure: &OrchestrationError,
        failures: u32,
    ) -> RecoveryDecision {
        if failure.is_fatal() {
            return RecoveryDecision::Degrade;
        }

        let circuit = if failure.is_agent_fault() {
            self.circuits.record_failure(agent_id).await
        } else {
            self.circuits.state(agent_id).await
        };

        let decision = if circuit == CircuitState::Open {
            RecoveryDecision::Fallback
        } else if failure.is_retryable() && self.retry.allows_retry(failures) {
            RecoveryDecision::Retry {
                delay: self.retry.delay_for(failures.saturating_sub(1)),
            }
        } else {
            RecoveryDecision::Fallback
        };

        debug!(
            agent_id = %agent_id,
            error = failure.kind(),
            failures,
            circuit = %circuit,
            decision = %decision,
            "Recovery decision"
        );
        decision
    }

    pub async fn on_success(&self, agent_id: &AgentId) {
        self.circuits.record_success(agent_id).await;
    }

    pub async fn circuit_state(&self, agent_id: &AgentId) -> CircuitState {
        self.circuits.state(agent_id).await
    }

    /// Takes the circuit permit for a new assignment.
    pub async fn acquire(&self, agent_id: &AgentId) -> bool {
        self.circuits.acquire(agent_id).await
    }

    pub async fn can_assign(&self, agent_id: &AgentId) -> bool {
        self.circuits.can_assign(agent_id).await
    }

    /// Returns a permit whose assignment ended without an agent outcome.
    pub async fn release(&self, agent_id: &AgentId) {
        self.circuits.release(agent_id).await;
    }
}
