//! Shared engine services
//!
//! These components are shared by every orchestration instance and are safe
//! to use concurrently:
//!
//! - [`MessageBus`](message_bus::MessageBus) - per-destination FIFO delivery
//! - [`AgentEndpoint`](agent_endpoint::AgentEndpoint) - adapts an [`Agent`](crate::ports::agent::Agent) to the bus
//! - [`AgentRegistry`](agent_registry::AgentRegistry) - descriptors, capability lookup, load accounting
//! - [`CircuitTable`](circuit_table::CircuitTable) - per-agent circuit breakers
//! - [`HealthMonitor`](health_monitor::HealthMonitor) - rolling outcome windows
//! - [`SelfHealingController`](self_healing::SelfHealingController) - retry / fallback / degrade decisions

pub mod agent_endpoint;
pub mod agent_registry;
pub mod circuit_table;
pub mod health_monitor;
pub mod message_bus;
pub mod self_healing;

/// Current time on the tokio clock, as a std `Instant`.
///
/// Going through tokio keeps circuit cool-downs consistent with a paused
/// test clock.
pub(crate) fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}
