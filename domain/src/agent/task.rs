//! Task view handed to agents

use crate::core::capability::CapabilitySet;
use crate::core::ids::TaskId;
use serde::{Deserialize, Serialize};

/// Submission priority. Carried through to agents; the engine itself does
/// not reorder work by priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The read-only part of an orchestration that agents may inspect.
///
/// Sent inside negotiate and request messages under the `task` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub request: String,
    pub capability_hint: CapabilitySet,
    #[serde(default)]
    pub priority: Priority,
}

impl Task {
    pub fn new(task_id: impl Into<TaskId>, request: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            request: request.into(),
            capability_hint: CapabilitySet::new(),
            priority: Priority::default(),
        }
    }

    pub fn with_capability(mut self, tag: impl Into<String>) -> Self {
        self.capability_hint.insert(tag);
        self
    }

    pub fn with_capabilities(mut self, hint: CapabilitySet) -> Self {
        self.capability_hint = hint;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_builder() {
        let task = Task::new("t1", "book a table")
            .with_capability("booking")
            .with_priority(Priority::High);
        assert_eq!(task.task_id.as_str(), "t1");
        assert!(task.capability_hint.contains("booking"));
        assert_eq!(task.priority, Priority::High);
    }

    #[test]
    fn test_priority_defaults_when_missing() {
        let task: Task = serde_json::from_str(
            r#"{"task_id": "t1", "request": "x", "capability_hint": ["research"]}"#,
        )
        .unwrap();
        assert_eq!(task.priority, Priority::Normal);
    }
}
