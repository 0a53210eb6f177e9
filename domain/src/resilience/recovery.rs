//! Recovery decisions

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What the supervisor should do after a failed assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RecoveryDecision {
    /// Re-run the same agent after `delay`
    Retry {
        #[serde(with = "crate::serde_millis")]
        delay: Duration,
    },
    /// Move on to the next candidate
    Fallback,
    /// Stop recovering and fail the orchestration
    Degrade,
}

impl RecoveryDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryDecision::Retry { .. } => "retry",
            RecoveryDecision::Fallback => "fallback",
            RecoveryDecision::Degrade => "degrade",
        }
    }
}

impl std::fmt::Display for RecoveryDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecoveryDecision::Retry { delay } => write!(f, "retry in {}ms", delay.as_millis()),
            other => write!(f, "{}", other.as_str()),
        }
    }
}
