//! Infrastructure layer for conductor
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod agents;
pub mod analysis;
pub mod config;
pub mod logging;

// Re-export commonly used types
pub use agents::SimulatedAgent;
pub use analysis::PatternTaskAnalyzer;
pub use config::{
    ConfigLoader, ConfigValidationError, FileAgentConfig, FileConfig, FileLoggingConfig,
    FileOutputConfig, FileOutputFormat,
};
pub use logging::JsonlCheckpointSink;
