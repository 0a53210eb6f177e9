//! Agent domain module
//!
//! Contains what the orchestrator knows about agents (descriptors) and the
//! task view agents receive when asked to bid or execute.

pub mod descriptor;
pub mod task;

pub use descriptor::{AgentDescriptor, AgentStatus};
pub use task::{Priority, Task};
