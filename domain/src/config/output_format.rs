//! Output format value object

use serde::{Deserialize, Serialize};

/// Output format for orchestration reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Outcome and final result only (default)
    #[default]
    Summary,
    /// Outcome, attempts, errors and the checkpoint trail
    Full,
    /// The whole report as JSON
    Json,
}
