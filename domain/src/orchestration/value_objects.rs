//! Orchestration value objects - immutable records produced while an
//! orchestration runs.
//!
//! - [`ErrorRecord`] - one failure, attributed to an agent and attempt
//! - [`Checkpoint`] - snapshot emitted on every phase transition
//! - [`OrchestrationReport`] - what the caller receives when an orchestration ends

use crate::core::error::OrchestrationError;
use crate::core::ids::{AgentId, TaskId};
use crate::orchestration::entities::Phase;
use crate::util::current_timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A single recorded failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Agent the failure is attributed to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
    /// Overall attempt number the failure belongs to (0 before any assignment)
    pub attempt: u32,
    pub kind: String,
    pub message: String,
    pub error: OrchestrationError,
    pub timestamp: u64,
}

impl ErrorRecord {
    pub fn new(agent_id: Option<AgentId>, attempt: u32, error: OrchestrationError) -> Self {
        Self {
            agent_id,
            attempt,
            kind: error.kind().to_string(),
            message: error.to_string(),
            error,
            timestamp: current_timestamp(),
        }
    }
}

/// Progress snapshot emitted on every phase transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub task_id: TaskId,
    pub phase: Phase,
    pub timestamp: u64,
    pub results_so_far: BTreeMap<String, Value>,
    pub errors_so_far: Vec<ErrorRecord>,
    pub retry_count: u32,
    pub active_agents: Vec<AgentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<AgentId>,
}

/// Terminal outcome of an orchestration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OrchestrationOutcome {
    Completed { result: Value },
    Failed { reason: OrchestrationError, attempts: u32 },
}

impl OrchestrationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, OrchestrationOutcome::Completed { .. })
    }
}

/// Everything the caller learns about a finished orchestration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationReport {
    pub task_id: TaskId,
    pub phase: Phase,
    pub outcome: OrchestrationOutcome,
    pub results: BTreeMap<String, Value>,
    pub errors: Vec<ErrorRecord>,
    /// Agents in the order they were assigned (retries repeat the id)
    pub attempts: Vec<AgentId>,
    pub negotiation_rounds: u32,
    pub checkpoints: Vec<Checkpoint>,
}

impl OrchestrationReport {
    /// Report for an orchestration that died before producing state, e.g. a
    /// panicked task.
    pub fn aborted(task_id: TaskId, reason: OrchestrationError) -> Self {
        Self {
            task_id,
            phase: Phase::Failed,
            errors: vec![ErrorRecord::new(None, 0, reason.clone())],
            outcome: OrchestrationOutcome::Failed {
                reason,
                attempts: 0,
            },
            results: BTreeMap::new(),
            attempts: Vec::new(),
            negotiation_rounds: 0,
            checkpoints: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            OrchestrationOutcome::Completed { result } => Some(result),
            OrchestrationOutcome::Failed { .. } => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&OrchestrationError> {
        match &self.outcome {
            OrchestrationOutcome::Completed { .. } => None,
            OrchestrationOutcome::Failed { reason, .. } => Some(reason),
        }
    }

    /// Error messages grouped by the agent they are attributed to.
    pub fn failures_by_agent(&self) -> BTreeMap<AgentId, Vec<String>> {
        let mut grouped: BTreeMap<AgentId, Vec<String>> = BTreeMap::new();
        for record in &self.errors {
            if let Some(agent_id) = &record.agent_id {
                grouped
                    .entry(agent_id.clone())
                    .or_default()
                    .push(record.message.clone());
            }
        }
        grouped
    }
}
