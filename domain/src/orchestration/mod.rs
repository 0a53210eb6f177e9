//! Orchestration domain
//!
//! The supervisor state machine's data: phases, the per-instance
//! [`ReactiveState`](entities::ReactiveState), checkpoints and the final report.

pub mod entities;
pub mod value_objects;
