//! Agent registry
//!
//! Owns every [`AgentDescriptor`]. Each operation takes the write lock for
//! the whole read-modify-write, so a descriptor update is never partially
//! visible. Callers only ever get clones.

use super::circuit_table::CircuitTable;
use crate::config::ExecutionParams;
use conductor_domain::{AgentDescriptor, AgentId, AgentStatus, CapabilitySet};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Unknown agent: {0}")]
    UnknownAgent(AgentId),

    #[error("Invalid load {load} for agent {agent_id}: must be within [0, 1]")]
    InvalidLoad { agent_id: AgentId, load: f64 },
}

pub struct AgentRegistry {
    agents: RwLock<HashMap<AgentId, AgentDescriptor>>,
    circuits: Arc<CircuitTable>,
    load_step: f64,
    success_rate_alpha: f64,
}

impl AgentRegistry {
    pub fn new(circuits: Arc<CircuitTable>, params: &ExecutionParams) -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
            circuits,
            load_step: params.load_step,
            success_rate_alpha: params.success_rate_alpha,
        }
    }

    /// Upserts an agent with a fresh descriptor.
    pub async fn register(
        &self,
        agent_id: AgentId,
        capabilities: CapabilitySet,
        initial_load: f64,
    ) -> Result<(), RegistryError> {
        validate_load(&agent_id, initial_load)?;
        let descriptor = AgentDescriptor::new(agent_id, capabilities).with_load(initial_load);
        self.register_descriptor(descriptor).await;
        Ok(())
    }

    /// Upserts a full descriptor.
    pub async fn register_descriptor(&self, descriptor: AgentDescriptor) {
        info!(
            agent_id = %descriptor.agent_id,
            capabilities = %descriptor.capabilities,
            "Registered agent"
        );
        self.agents
            .write()
            .await
            .insert(descriptor.agent_id.clone(), descriptor);
    }

    pub async fn heartbeat(
        &self,
        agent_id: &AgentId,
        load: f64,
        status: AgentStatus,
    ) -> Result<(), RegistryError> {
        validate_load(agent_id, load)?;
        self.update(agent_id, |d| d.heartbeat(load, status)).await?;
        debug!(agent_id = %agent_id, load, status = %status, "Heartbeat");
        Ok(())
    }

    pub async fn deregister(&self, agent_id: &AgentId) -> Option<AgentDescriptor> {
        let removed = self.agents.write().await.remove(agent_id);
        if removed.is_some() {
            info!(agent_id = %agent_id, "Deregistered agent");
        }
        removed
    }

    pub async fn set_status(
        &self,
        agent_id: &AgentId,
        status: AgentStatus,
    ) -> Result<(), RegistryError> {
        self.update(agent_id, |d| d.status = status).await
    }

    /// Agents advertising `tag`, sorted, without offline agents or agents
    /// whose circuit is open.
    pub async fn find_capable(&self, tag: &str) -> Vec<AgentId> {
        self.find_where(|d| d.can_handle(tag)).await
    }

    /// Agents advertising any tag of `hint`, with the same exclusions as
    /// [`find_capable`](Self::find_capable).
    pub async fn find_capable_any(&self, hint: &CapabilitySet) -> Vec<AgentId> {
        self.find_where(|d| d.can_handle_any(hint)).await
    }

    async fn find_where(&self, predicate: impl Fn(&AgentDescriptor) -> bool) -> Vec<AgentId> {
        let candidates: Vec<AgentId> = self
            .agents
            .read()
            .await
            .values()
            .filter(|d| d.status.accepts_work() && predicate(d))
            .map(|d| d.agent_id.clone())
            .collect();

        let mut capable = Vec::with_capacity(candidates.len());
        for agent_id in candidates {
            if !self.circuits.is_open(&agent_id).await {
                capable.push(agent_id);
            }
        }
        capable.sort();
        capable
    }

    pub async fn begin_assignment(&self, agent_id: &AgentId) -> Result<(), RegistryError> {
        let step = self.load_step;
        self.update(agent_id, |d| d.begin_assignment(step)).await
    }

    pub async fn end_assignment(
        &self,
        agent_id: &AgentId,
        success: bool,
    ) -> Result<(), RegistryError> {
        let alpha = self.success_rate_alpha;
        self.update(agent_id, |d| d.end_assignment(success, alpha))
            .await
    }

    /// Releases the load of an assignment that ended without an agent
    /// outcome (cancellation, orchestration timeout).
    pub async fn release_assignment(&self, agent_id: &AgentId) -> Result<(), RegistryError> {
        self.update(agent_id, |d| d.release_assignment()).await
    }

    async fn update(
        &self,
        agent_id: &AgentId,
        f: impl FnOnce(&mut AgentDescriptor),
    ) -> Result<(), RegistryError> {
        let mut agents = self.agents.write().await;
        let descriptor = agents
            .get_mut(agent_id)
            .ok_or_else(|| RegistryError::UnknownAgent(agent_id.clone()))?;
        f(descriptor);
        Ok(())
    }

    pub async fn snapshot(&self, agent_id: &AgentId) -> Option<AgentDescriptor> {
        self.agents.read().await.get(agent_id).cloned()
    }

    pub async fn descriptors(&self) -> HashMap<AgentId, AgentDescriptor> {
        self.agents.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.agents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.agents.read().await.is_empty()
    }
}

fn validate_load(agent_id: &AgentId, load: f64) -> Result<(), RegistryError> {
    if (0.0..=1.0).contains(&load) {
        Ok(())
    } else {
        Err(RegistryError::InvalidLoad {
            agent_id: agent_id.clone(),
            load,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_domain::CircuitConfig;

    fn registry() -> (AgentRegistry, Arc<CircuitTable>) {
        let circuits = Arc::new(CircuitTable::new(CircuitConfig {
            failure_threshold: 1,
            ..Default::default()
        }));
        (
            AgentRegistry::new(Arc::clone(&circuits), &ExecutionParams::default()),
            circuits,
        )
    }

    fn caps(tags: &[&str]) -> CapabilitySet {
        tags.iter().copied().collect()
    }

    #[tokio::test]
    async fn test_find_capable_sorted_and_filtered() {
        let (registry, _) = registry();
        registry.register(AgentId::new("voice"), caps(&["voice_call"]), 0.0).await.unwrap();
        registry.register(AgentId::new("search_b"), caps(&["research"]), 0.0).await.unwrap();
        registry.register(AgentId::new("search_a"), caps(&["research", "web_search"]), 0.0).await.unwrap();

        assert_eq!(
            registry.find_capable("research").await,
            vec![AgentId::new("search_a"), AgentId::new("search_b")]
        );
        assert_eq!(
            registry.find_capable_any(&caps(&["web_search", "voice_call"])).await,
            vec![AgentId::new("search_a"), AgentId::new("voice")]
        );
        assert!(registry.find_capable("booking").await.is_empty());
    }

    #[tokio::test]
    async fn test_open_circuit_and_offline_are_excluded() {
        let (registry, circuits) = registry();
        registry.register(AgentId::new("a"), caps(&["research"]), 0.0).await.unwrap();
        registry.register(AgentId::new("b"), caps(&["research"]), 0.0).await.unwrap();
        registry.register(AgentId::new("c"), caps(&["research"]), 0.0).await.unwrap();

        circuits.record_failure(&AgentId::new("a")).await;
        registry.set_status(&AgentId::new("b"), AgentStatus::Offline).await.unwrap();

        assert_eq!(registry.find_capable("research").await, vec![AgentId::new("c")]);
    }

    #[tokio::test]
    async fn test_heartbeat_validation() {
        let (registry, _) = registry();
        let id = AgentId::new("a");
        assert_eq!(
            registry.heartbeat(&id, 0.5, AgentStatus::Busy).await,
            Err(RegistryError::UnknownAgent(id.clone()))
        );

        registry.register(id.clone(), caps(&["research"]), 0.0).await.unwrap();
        assert!(matches!(
            registry.heartbeat(&id, 1.5, AgentStatus::Busy).await,
            Err(RegistryError::InvalidLoad { .. })
        ));
        registry.heartbeat(&id, 0.5, AgentStatus::Busy).await.unwrap();

        let snapshot = registry.snapshot(&id).await.unwrap();
        assert_eq!(snapshot.current_load, 0.5);
        assert_eq!(snapshot.status, AgentStatus::Busy);
    }

    #[tokio::test]
    async fn test_assignment_load_accounting() {
        let (registry, _) = registry();
        let id = AgentId::new("a");
        registry.register(id.clone(), caps(&["research"]), 0.1).await.unwrap();

        registry.begin_assignment(&id).await.unwrap();
        assert!((registry.snapshot(&id).await.unwrap().current_load - 0.35).abs() < 1e-9);

        registry.end_assignment(&id, false).await.unwrap();
        let after = registry.snapshot(&id).await.unwrap();
        assert!((after.current_load - 0.1).abs() < 1e-9);
        assert!((after.historical_success_rate - 0.8).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_busy_agent_load_does_not_drift() {
        let (registry, _) = registry();
        let id = AgentId::new("a");
        registry.register(id.clone(), caps(&["research"]), 0.9).await.unwrap();

        for _ in 0..3 {
            registry.begin_assignment(&id).await.unwrap();
            assert_eq!(registry.snapshot(&id).await.unwrap().current_load, 1.0);
            registry.end_assignment(&id, true).await.unwrap();
            assert!((registry.snapshot(&id).await.unwrap().current_load - 0.9).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn test_register_is_upsert() {
        let (registry, _) = registry();
        let id = AgentId::new("a");
        registry.register(id.clone(), caps(&["research"]), 0.0).await.unwrap();
        registry.register(id.clone(), caps(&["booking"]), 0.2).await.unwrap();

        assert_eq!(registry.len().await, 1);
        assert!(registry.find_capable("research").await.is_empty());
        assert_eq!(registry.find_capable("booking").await, vec![id.clone()]);
        assert!(registry.deregister(&id).await.is_some());
        assert!(registry.is_empty().await);
    }
}
