//! Domain layer for conductor
//!
//! This crate contains the core types and pure algorithms of the
//! orchestration engine. It has no dependencies on an async runtime,
//! infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Orchestration
//!
//! One submitted task is driven through a state machine
//! (`INITIALIZING → BROADCASTING → NEGOTIATING → EXECUTING → MONITORING →
//! AGGREGATING → COMPLETED`, with `FAILED` reachable from any non-terminal
//! phase). Its [`ReactiveState`] tracks every message, the correlation table,
//! results, errors and checkpoints.
//!
//! ## Negotiation
//!
//! When several agents can handle a task they bid; bids are scored as
//! `confidence × (1 − load) × success_rate` and ranked deterministically.
//!
//! ## Resilience
//!
//! Per-agent [`CircuitBreaker`]s, a [`RetryPolicy`] with exponential backoff,
//! and a rolling [`HealthWindow`] decide when to retry, fall back or give up.

pub mod agent;
pub mod config;
pub mod core;
pub mod health;
pub mod message;
pub mod negotiation;
pub mod orchestration;
pub mod resilience;
pub(crate) mod serde_millis;
pub mod util;

// Re-export commonly used types
pub use agent::{AgentDescriptor, AgentStatus, Priority, Task};
pub use config::{ConfigIssue, ConfigIssueCode, OutputFormat, Severity};
pub use core::{
    capability::CapabilitySet,
    error::{MessageError, OrchestrationError},
    ids::{AgentId, CorrelationId, MessageId, TaskId},
};
pub use health::{HealthReport, HealthThresholds, HealthWindow, Outcome};
pub use message::{AgentMessage, MessageType};
pub use negotiation::{Bid, NegotiationOutcome, ScoredBid, rank_bids, score};
pub use orchestration::{
    entities::{
        AgentRuntimeState, Assignment, DropReason, Inbound, Phase, ReactiveState, RuntimeStatus,
        StateError,
    },
    value_objects::{Checkpoint, ErrorRecord, OrchestrationOutcome, OrchestrationReport},
};
pub use resilience::{CircuitBreaker, CircuitConfig, CircuitState, RecoveryDecision, RetryPolicy};
