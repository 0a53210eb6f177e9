//! Task analysis configuration from TOML (`[analysis]` section)

use conductor_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAnalysisConfig {
    /// Requests analysed at or below this confidence are not orchestrated
    pub confidence_threshold: f64,
}

impl Default for FileAnalysisConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.6,
        }
    }
}

impl FileAnalysisConfig {
    pub(super) fn validate(&self, issues: &mut Vec<ConfigIssue>) {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::OutOfRange,
                format!(
                    "analysis.confidence_threshold must be within [0, 1], got {}",
                    self.confidence_threshold
                ),
            ));
        }
    }
}
