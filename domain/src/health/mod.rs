//! Agent health tracking
//!
//! A rolling window of assignment outcomes per agent, scored by error and
//! timeout rate and thresholded into an [`AgentStatus`](crate::AgentStatus).

pub mod window;

pub use window::{HealthReport, HealthThresholds, HealthWindow, Outcome};
