//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod agents;
mod analysis;
mod engine;
mod logging;
mod output;

pub use agents::FileAgentConfig;
pub use analysis::FileAnalysisConfig;
pub use engine::{
    FileCircuitConfig, FileExecutionConfig, FileHealthConfig, FileNegotiationConfig,
    FileRetryConfig,
};
pub use logging::FileLoggingConfig;
pub use output::{FileOutputConfig, FileOutputFormat};

use conductor_application::OrchestratorConfig;
use conductor_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Raised when validation finds at least one error-severity issue.
#[derive(Error, Debug)]
pub enum ConfigValidationError {
    #[error("invalid configuration: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Invalid(Vec<ConfigIssue>),
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Bid collection
    pub negotiation: FileNegotiationConfig,
    /// Assignment and orchestration timeouts, load accounting
    pub execution: FileExecutionConfig,
    /// Retry budget and backoff
    pub retry: FileRetryConfig,
    /// Circuit breaker
    pub circuit: FileCircuitConfig,
    /// Health scoring
    pub health: FileHealthConfig,
    /// Request analysis before submission
    pub analysis: FileAnalysisConfig,
    /// Log and checkpoint files
    pub logging: FileLoggingConfig,
    /// Output settings
    pub output: FileOutputConfig,
    /// Simulated agents to register
    pub agents: Vec<FileAgentConfig>,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    ///
    /// Checks zero timeouts, ratios outside `[0, 1]`, inverted health
    /// thresholds, shrinking backoff, duplicate agent ids and agents that
    /// advertise no capability.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        self.negotiation.validate(&mut issues);
        self.execution.validate(&mut issues);
        self.retry.validate(&mut issues);
        self.circuit.validate(&mut issues);
        self.health.validate(&mut issues);
        self.analysis.validate(&mut issues);

        let mut seen = HashSet::new();
        for (index, agent) in self.agents.iter().enumerate() {
            agent.validate(index, &mut issues);
            if !agent.id.is_empty() && !seen.insert(agent.id.as_str()) {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::DuplicateAgent,
                    format!("agent id '{}' is defined more than once", agent.id),
                ));
            }
        }

        issues
    }

    /// Like [`validate`](Self::validate), but fails on error-severity issues
    /// and returns the remaining warnings.
    pub fn ensure_valid(&self) -> Result<Vec<ConfigIssue>, ConfigValidationError> {
        let (errors, warnings): (Vec<_>, Vec<_>) =
            self.validate().into_iter().partition(ConfigIssue::is_error);
        if errors.is_empty() {
            Ok(warnings)
        } else {
            Err(ConfigValidationError::Invalid(errors))
        }
    }

    /// Engine configuration built from the tuning sections.
    pub fn to_orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            negotiation: self.negotiation.to_params(),
            execution: self.execution.to_params(),
            retry: self.retry.to_policy(),
            circuit: self.circuit.to_config(),
            health: self.health.to_thresholds(),
        }
    }
}
