//! Port for checkpoint persistence.
//!
//! Defines the [`CheckpointSink`] trait that receives a [`Checkpoint`] on every
//! supervisor phase transition. This is the durable record of progress and is
//! separate from `tracing` diagnostics.

use conductor_domain::Checkpoint;
use std::sync::Mutex;

/// Port for emitting checkpoints to external storage.
///
/// `emit` is synchronous and non-fallible: a failing sink must never disturb
/// the orchestration, so implementations log and swallow their own errors.
pub trait CheckpointSink: Send + Sync {
    fn emit(&self, checkpoint: &Checkpoint);
}

/// No-op implementation for when persistence is disabled.
pub struct NoCheckpointSink;

impl CheckpointSink for NoCheckpointSink {
    fn emit(&self, _checkpoint: &Checkpoint) {}
}

/// Keeps every emitted checkpoint in memory (tests, embedding).
#[derive(Default)]
pub struct MemoryCheckpointSink {
    checkpoints: Mutex<Vec<Checkpoint>>,
}

impl MemoryCheckpointSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn checkpoints(&self) -> Vec<Checkpoint> {
        self.checkpoints
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.checkpoints.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CheckpointSink for MemoryCheckpointSink {
    fn emit(&self, checkpoint: &Checkpoint) {
        if let Ok(mut guard) = self.checkpoints.lock() {
            guard.push(checkpoint.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_domain::{Phase, ReactiveState, Task};

    #[test]
    fn test_memory_sink_collects() {
        let sink = MemoryCheckpointSink::new();
        assert!(sink.is_empty());

        let mut state = ReactiveState::new(Task::new("t1", "hello"));
        sink.emit(&state.checkpoints()[0]);
        let checkpoint = state.transition(Phase::Broadcasting).unwrap().clone();
        sink.emit(&checkpoint);

        let phases: Vec<Phase> = sink.checkpoints().iter().map(|c| c.phase).collect();
        assert_eq!(phases, vec![Phase::Initializing, Phase::Broadcasting]);
    }
}
