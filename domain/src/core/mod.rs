//! Core domain concepts shared across all subdomains.
//!
//! - [`ids`] - agent, task, message and correlation identifiers
//! - [`capability::CapabilitySet`] - capability tags used for routing
//! - [`error::OrchestrationError`] - the orchestration error taxonomy

pub mod capability;
pub mod error;
pub mod ids;
