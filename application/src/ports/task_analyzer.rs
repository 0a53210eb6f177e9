//! Task analyzer port
//!
//! Turns a free-text request into a capability hint. The engine treats the
//! hint as an opaque tag set; analysis happens before submission.

use conductor_domain::CapabilitySet;
use serde::{Deserialize, Serialize};

/// Result of analysing a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAnalysis {
    /// Whether the request should be handed to agents at all
    pub suitable: bool,
    pub confidence: f64,
    /// Matched task family (e.g. `research`, `booking`), if any
    pub task_type: Option<String>,
    pub capability_hint: CapabilitySet,
    pub reasoning: String,
}

impl TaskAnalysis {
    pub fn unsuitable(confidence: f64, reasoning: impl Into<String>) -> Self {
        Self {
            suitable: false,
            confidence,
            task_type: None,
            capability_hint: CapabilitySet::new(),
            reasoning: reasoning.into(),
        }
    }

    /// Suitable and above `threshold`.
    pub fn should_orchestrate(&self, threshold: f64) -> bool {
        self.suitable && self.confidence > threshold && !self.capability_hint.is_empty()
    }
}

pub trait TaskAnalyzer: Send + Sync {
    fn analyze(&self, request: &str) -> TaskAnalysis;
}
