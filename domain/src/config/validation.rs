//! Configuration validation issues.
//!
//! Validation never fails fast: callers collect every [`ConfigIssue`] and
//! decide what to do with errors versus warnings.

use std::fmt;

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the configuration cannot work at all.
    Error,
    /// Non-fatal: the configuration works but may not behave as expected.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigIssueCode {
    /// A timeout or cool-down is zero.
    ZeroDuration,
    /// A ratio (threshold, weight, load, confidence) is outside `[0, 1]`.
    OutOfRange,
    /// `offline_below` is above `available_above`.
    InvertedThresholds,
    /// Backoff factor below 1 makes delays shrink.
    ShrinkingBackoff,
    /// Assignment timeout longer than the whole orchestration budget.
    AssignmentExceedsOrchestration,
    /// Two `[[agents]]` entries share an id.
    DuplicateAgent,
    /// An agent advertises no capability and can never be selected.
    AgentWithoutCapabilities,
}

/// A detected configuration problem.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}", level, self.message)
    }
}
