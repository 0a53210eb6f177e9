//! Application layer for conductor
//!
//! This crate contains the supervisor use case, the shared engine services,
//! port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod services;
pub mod use_cases;

// Re-export commonly used types
pub use config::{ExecutionParams, NegotiationParams, OrchestratorConfig};
pub use ports::{
    agent::{Agent, AgentContext, AgentFailure, AgentFault},
    checkpoint_sink::{CheckpointSink, MemoryCheckpointSink, NoCheckpointSink},
    progress::{NoProgress, ProgressNotifier},
    task_analyzer::{TaskAnalysis, TaskAnalyzer},
};
pub use services::{
    agent_endpoint::AgentEndpoint,
    agent_registry::{AgentRegistry, RegistryError},
    circuit_table::CircuitTable,
    health_monitor::HealthMonitor,
    message_bus::{BusError, MessageBus, MessageHandler},
    self_healing::SelfHealingController,
};
pub use use_cases::negotiate::NegotiationBroker;
pub use use_cases::orchestrate::{OrchestrationHandle, Supervisor, TaskSubmission};
