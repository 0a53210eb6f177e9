//! Application-level configuration.
//!
//! This module provides configuration types that control how the engine behaves:
//!
//! - [`ExecutionParams`] - assignment and orchestration timeouts, load accounting
//! - [`OrchestratorConfig`] - every tunable of the engine in one container

pub mod execution_params;
pub mod orchestrator_config;

pub use execution_params::ExecutionParams;
pub use orchestrator_config::{NegotiationParams, OrchestratorConfig};
