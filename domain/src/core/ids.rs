//! Identifier value objects.
//!
//! - [`AgentId`] - addressable endpoint on the message bus (agents and supervisor inboxes)
//! - [`TaskId`] - identifies one orchestration instance
//! - [`MessageId`] / [`CorrelationId`] - message identity and request/reply pairing

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of an agent (or any other bus address).
///
/// Ordering is lexicographic on the underlying string, which is what the
/// negotiation tie-break relies on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    /// Prefix used for per-orchestration supervisor inboxes.
    pub const SUPERVISOR_PREFIX: &'static str = "supervisor/";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Bus address of the supervisor inbox owned by the given task.
    pub fn supervisor_inbox(task_id: &TaskId) -> Self {
        Self(format!("{}{}", Self::SUPERVISOR_PREFIX, task_id))
    }

    /// Inbox address for one orchestration run of `task_id`. A random
    /// instance suffix keeps runs that reuse a task id on separate endpoints.
    pub fn supervisor_instance(task_id: &TaskId) -> Self {
        Self(format!(
            "{}{}/{}",
            Self::SUPERVISOR_PREFIX,
            task_id,
            Uuid::new_v4().simple()
        ))
    }

    pub fn is_supervisor(&self) -> bool {
        self.0.starts_with(Self::SUPERVISOR_PREFIX)
    }

    /// Task owning a supervisor inbox address, with any instance suffix removed.
    pub fn supervised_task(&self) -> Option<TaskId> {
        let rest = self.0.strip_prefix(Self::SUPERVISOR_PREFIX)?;
        let task = match rest.rsplit_once('/') {
            Some((task, instance))
                if instance.len() == 32 && instance.bytes().all(|b| b.is_ascii_hexdigit()) =>
            {
                task
            }
            _ => rest,
        };
        Some(TaskId::new(task))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a submitted task (one orchestration instance).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random task id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identity of a single message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ties a response, error, bid or status message to the request that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supervisor_inbox_address() {
        let inbox = AgentId::supervisor_inbox(&TaskId::new("task-1"));
        assert_eq!(inbox.as_str(), "supervisor/task-1");
        assert!(inbox.is_supervisor());
        assert!(!AgentId::new("search_agent").is_supervisor());
    }

    #[test]
    fn test_supervisor_instances_are_distinct() {
        let task = TaskId::new("jobs/42");
        let first = AgentId::supervisor_instance(&task);
        let second = AgentId::supervisor_instance(&task);
        assert_ne!(first, second);
        assert!(first.is_supervisor());
        assert_eq!(first.supervised_task(), Some(task.clone()));
        assert_eq!(
            AgentId::supervisor_inbox(&task).supervised_task(),
            Some(task)
        );
        assert_eq!(AgentId::new("search_agent").supervised_task(), None);
    }

    #[test]
    fn test_agent_id_orders_lexicographically() {
        let mut ids = vec![AgentId::new("b"), AgentId::new("a2"), AgentId::new("a10")];
        ids.sort();
        assert_eq!(ids, vec![AgentId::new("a10"), AgentId::new("a2"), AgentId::new("b")]);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(CorrelationId::generate(), CorrelationId::generate());
        assert_ne!(TaskId::generate(), TaskId::generate());
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let json = serde_json::to_string(&AgentId::new("voice_agent")).unwrap();
        assert_eq!(json, "\"voice_agent\"");
    }
}
