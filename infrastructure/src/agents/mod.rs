//! Agent adapters.
//!
//! Real search/voice/browser agents live outside this workspace; the
//! simulated agent stands in for them in demos and smoke runs.

mod simulated;

pub use simulated::SimulatedAgent;
