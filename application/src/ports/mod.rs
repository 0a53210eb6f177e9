//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod agent;
pub mod checkpoint_sink;
pub mod progress;
pub mod task_analyzer;
