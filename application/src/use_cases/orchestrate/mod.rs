//! Orchestrate use case
//!
//! The [`Supervisor`] drives one task through its lifecycle:
//! 1. Broadcasting - find agents whose capabilities intersect the hint
//! 2. Negotiating - collect and rank bids (skipped for a single candidate)
//! 3. Executing / Monitoring - assign the winner and wait for its reply
//!    - Self-healing - retry with backoff, fall back to the next candidate, or degrade
//! 4. Aggregating - merge the collected results
//!
//! Every orchestration owns its [`ReactiveState`](conductor_domain::ReactiveState)
//! and a dedicated bus inbox; registry, circuits and health windows are shared.

mod driver;
mod types;


pub use types::{OrchestrationHandle, TaskSubmission};

use crate::config::OrchestratorConfig;
use crate::ports::agent::Agent;
use crate::ports::checkpoint_sink::{CheckpointSink, NoCheckpointSink};
use crate::ports::progress::{NoProgress, ProgressNotifier};
use crate::services::agent_endpoint::AgentEndpoint;
use crate::services::agent_registry::{AgentRegistry, RegistryError};
use crate::services::circuit_table::CircuitTable;
use crate::services::health_monitor::HealthMonitor;
use crate::services::message_bus::MessageBus;
use crate::services::self_healing::SelfHealingController;
use crate::use_cases::negotiate::NegotiationBroker;
use conductor_domain::OrchestrationReport;
use driver::Orchestration;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Entry point for submitting tasks.
///
/// Cheap to clone; clones share the bus, registry, circuits and health
/// windows.
#[derive(Clone)]
pub struct Supervisor {
    bus: MessageBus,
    registry: Arc<AgentRegistry>,
    circuits: Arc<CircuitTable>,
    health: Arc<HealthMonitor>,
    healing: Arc<SelfHealingController>,
    broker: Arc<NegotiationBroker>,
    sink: Arc<dyn CheckpointSink>,
    progress: Arc<dyn ProgressNotifier>,
    config: Arc<OrchestratorConfig>,
}

impl Supervisor {
    pub fn new(bus: MessageBus, config: OrchestratorConfig) -> Self {
        let circuits = Arc::new(CircuitTable::new(config.circuit.clone()));
        let registry = Arc::new(AgentRegistry::new(circuits.clone(), &config.execution));
        let health = Arc::new(HealthMonitor::new(config.health.clone()));
        let healing = Arc::new(SelfHealingController::new(
            circuits.clone(),
            config.retry.clone(),
        ));
        let broker = Arc::new(NegotiationBroker::new(
            bus.clone(),
            registry.clone(),
            config.negotiation.bid_timeout,
        ));
        Self {
            bus,
            registry,
            circuits,
            health,
            healing,
            broker,
            sink: Arc::new(NoCheckpointSink),
            progress: Arc::new(NoProgress),
            config: Arc::new(config),
        }
    }

    pub fn with_checkpoint_sink(mut self, sink: Arc<dyn CheckpointSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressNotifier>) -> Self {
        self.progress = progress;
        self
    }

    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn circuits(&self) -> &Arc<CircuitTable> {
        &self.circuits
    }

    pub fn health(&self) -> &Arc<HealthMonitor> {
        &self.health
    }

    pub fn healing(&self) -> &Arc<SelfHealingController> {
        &self.healing
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Registers `agent` with the given initial load and subscribes it to
    /// the bus under its id.
    pub async fn attach_agent(
        &self,
        agent: Arc<dyn Agent>,
        initial_load: f64,
    ) -> Result<(), RegistryError> {
        self.registry
            .register(agent.id().clone(), agent.capabilities().clone(), initial_load)
            .await?;
        info!(
            agent_id = %agent.id(),
            capabilities = %agent.capabilities(),
            "Agent attached"
        );
        AgentEndpoint::attach(agent, &self.bus).await;
        Ok(())
    }

    /// Removes an agent from the registry and the bus.
    pub async fn detach_agent(&self, agent_id: &conductor_domain::AgentId) -> bool {
        let known = self.registry.deregister(agent_id).await.is_some();
        let subscribed = self.bus.unsubscribe(agent_id).await;
        known || subscribed
    }

    /// Runs a task to completion on the current task.
    pub async fn run(&self, submission: TaskSubmission) -> OrchestrationReport {
        self.run_with_cancellation(submission, CancellationToken::new())
            .await
    }

    /// Runs a task to completion, failing with `Cancelled` once `cancel` fires.
    pub async fn run_with_cancellation(
        &self,
        submission: TaskSubmission,
        cancel: CancellationToken,
    ) -> OrchestrationReport {
        Orchestration::start(self.clone(), submission.into_task(), cancel)
            .await
            .drive()
            .await
    }

    /// Spawns the orchestration and returns a handle to await or cancel it.
    pub fn submit(&self, submission: TaskSubmission) -> OrchestrationHandle {
        let cancel = CancellationToken::new();
        let task_id = submission.task_id.clone();
        let supervisor = self.clone();
        let token = cancel.clone();
        let join = tokio::spawn(async move {
            supervisor.run_with_cancellation(submission, token).await
        });
        OrchestrationHandle {
            task_id,
            cancel,
            join,
        }
    }
}
