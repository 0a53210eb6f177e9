//! File-backed structured logging sinks.

mod jsonl_checkpoint_sink;

pub use jsonl_checkpoint_sink::JsonlCheckpointSink;
