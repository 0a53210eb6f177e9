//! Per-agent circuit breakers
//!
//! Shared between the registry (which hides agents with an open circuit) and
//! the self-healing controller (which records outcomes and grants trials).

use super::now;
use conductor_domain::{AgentId, CircuitBreaker, CircuitConfig, CircuitState};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::{info, warn};

pub struct CircuitTable {
    breakers: RwLock<HashMap<AgentId, CircuitBreaker>>,
    config: CircuitConfig,
}

impl CircuitTable {
    pub fn new(config: CircuitConfig) -> Self {
        Self {
            breakers: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &CircuitConfig {
        &self.config
    }

    /// Current state; agents without history are closed.
    pub async fn state(&self, agent_id: &AgentId) -> CircuitState {
        self.breakers
            .read()
            .await
            .get(agent_id)
            .map(|b| b.state_at(now(), &self.config))
            .unwrap_or_default()
    }

    pub async fn is_open(&self, agent_id: &AgentId) -> bool {
        self.state(agent_id).await == CircuitState::Open
    }

    /// Whether [`acquire`](Self::acquire) would currently succeed.
    pub async fn can_assign(&self, agent_id: &AgentId) -> bool {
        self.breakers
            .read()
            .await
            .get(agent_id)
            .is_none_or(|b| b.can_assign(now(), &self.config))
    }

    /// Takes permission for one assignment. In half-open state only one
    /// caller gets it until the trial outcome is recorded or released.
    pub async fn acquire(&self, agent_id: &AgentId) -> bool {
        let mut breakers = self.breakers.write().await;
        let breaker = breakers.entry(agent_id.clone()).or_default();
        let granted = breaker.allow(now(), &self.config);
        if granted && breaker.state_at(now(), &self.config) == CircuitState::HalfOpen {
            info!(agent_id = %agent_id, "Circuit half-open, granting trial assignment");
        }
        granted
    }

    pub async fn release(&self, agent_id: &AgentId) {
        if let Some(breaker) = self.breakers.write().await.get_mut(agent_id) {
            breaker.release();
        }
    }

    pub async fn record_success(&self, agent_id: &AgentId) {
        let mut breakers = self.breakers.write().await;
        let breaker = breakers.entry(agent_id.clone()).or_default();
        if breaker.state_at(now(), &self.config) != CircuitState::Closed {
            info!(agent_id = %agent_id, "Circuit closed");
        }
        breaker.record_success();
    }

    /// Records a failure and returns the resulting state.
    pub async fn record_failure(&self, agent_id: &AgentId) -> CircuitState {
        let mut breakers = self.breakers.write().await;
        let breaker = breakers.entry(agent_id.clone()).or_default();
        let before = breaker.state_at(now(), &self.config);
        let after = breaker.record_failure(now(), &self.config);
        if after == CircuitState::Open && before != CircuitState::Open {
            warn!(
                agent_id = %agent_id,
                consecutive_failures = breaker.consecutive_failures(),
                "Circuit opened"
            );
        }
        after
    }

    /// States of all agents with history, sorted by id.
    pub async fn snapshot(&self) -> BTreeMap<AgentId, CircuitState> {
        let at = now();
        self.breakers
            .read()
            .await
            .iter()
            .map(|(id, b)| (id.clone(), b.state_at(at, &self.config)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn table() -> CircuitTable {
        CircuitTable::new(CircuitConfig {
            failure_threshold: 2,
            cool_down: Duration::from_secs(5),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_then_half_open_trial() {
        let table = table();
        let agent = AgentId::new("a");

        assert_eq!(table.state(&agent).await, CircuitState::Closed);
        table.record_failure(&agent).await;
        assert_eq!(table.record_failure(&agent).await, CircuitState::Open);
        assert!(table.is_open(&agent).await);
        assert!(!table.acquire(&agent).await);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(table.state(&agent).await, CircuitState::HalfOpen);
        assert!(table.can_assign(&agent).await);
        assert!(table.acquire(&agent).await);
        assert!(!table.acquire(&agent).await);

        table.record_success(&agent).await;
        assert_eq!(table.state(&agent).await, CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_released_trial_can_be_reacquired() {
        let table = table();
        let agent = AgentId::new("a");
        table.record_failure(&agent).await;
        table.record_failure(&agent).await;
        tokio::time::advance(Duration::from_secs(6)).await;

        assert!(table.acquire(&agent).await);
        table.release(&agent).await;
        assert!(table.acquire(&agent).await);
    }

    #[tokio::test]
    async fn test_snapshot() {
        let table = table();
        table.record_failure(&AgentId::new("b")).await;
        table.record_success(&AgentId::new("a")).await;
        let snapshot = table.snapshot().await;
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[&AgentId::new("b")], CircuitState::Closed);
    }
}
