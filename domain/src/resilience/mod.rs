//! Failure isolation and recovery primitives
//!
//! - [`CircuitBreaker`] - per-agent closed / open / half-open state machine
//! - [`RetryPolicy`] - retry budget and exponential backoff
//! - [`RecoveryDecision`] - what to do after a failed assignment

pub mod circuit;
pub mod recovery;
pub mod retry;

pub use circuit::{CircuitBreaker, CircuitConfig, CircuitState};
pub use recovery::RecoveryDecision;
pub use retry::RetryPolicy;
