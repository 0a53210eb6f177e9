//! Simulated agent entries from TOML (`[[agents]]` array)

use conductor_domain::{CapabilitySet, ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One `[[agents]]` entry.
///
/// ```toml
/// [[agents]]
/// id = "search_agent"
/// capabilities = ["research", "web_search"]
/// confidence = 0.9
/// latency_ms = 300
/// fail_first = 1
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAgentConfig {
    pub id: String,
    pub capabilities: Vec<String>,
    /// Bid confidence in `[0, 1]`
    pub confidence: f64,
    /// Estimated completion time in seconds, included in bids
    pub estimated_cost: Option<f64>,
    /// Load reported at registration
    pub initial_load: f64,
    /// Simulated execution time
    pub latency_ms: u64,
    /// Initial requests answered with a retryable error
    pub fail_first: u32,
    /// Initial requests never answered
    pub hang_first: u32,
    /// JSON payload merged into every response
    pub output: Option<Value>,
}

impl Default for FileAgentConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            capabilities: Vec::new(),
            confidence: 0.5,
            estimated_cost: None,
            initial_load: 0.0,
            latency_ms: 0,
            fail_first: 0,
            hang_first: 0,
            output: None,
        }
    }
}

impl FileAgentConfig {
    pub fn capability_set(&self) -> CapabilitySet {
        self.capabilities.iter().map(String::as_str).collect()
    }

    pub(super) fn validate(&self, index: usize, issues: &mut Vec<ConfigIssue>) {
        let name = if self.id.trim().is_empty() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::OutOfRange,
                format!("agents[{index}].id cannot be empty"),
            ));
            format!("agents[{index}]")
        } else {
            format!("agent '{}'", self.id)
        };
        if self.capability_set().is_empty() {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::AgentWithoutCapabilities,
                format!("{name} has no capabilities and will never be selected"),
            ));
        }
        for (field, value) in [
            ("confidence", self.confidence),
            ("initial_load", self.initial_load),
        ] {
            if !(0.0..=1.0).contains(&value) {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::OutOfRange,
                    format!("{name}: {field} must be within [0, 1], got {value}"),
                ));
            }
        }
    }
}
