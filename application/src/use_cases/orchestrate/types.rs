//! Submission and handle types for the orchestrate use case.

use conductor_domain::{CapabilitySet, OrchestrationError, OrchestrationReport, Priority, Task, TaskId};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::error;

/// A task as submitted by a caller.
#[derive(Debug, Clone)]
pub struct TaskSubmission {
    pub task_id: TaskId,
    pub original_request: String,
    pub capability_hint: CapabilitySet,
    pub priority: Priority,
}

impl TaskSubmission {
    /// New submission with a generated task id.
    pub fn new(request: impl Into<String>) -> Self {
        Self {
            task_id: TaskId::generate(),
            original_request: request.into(),
            capability_hint: CapabilitySet::new(),
            priority: Priority::default(),
        }
    }

    pub fn with_task_id(mut self, task_id: impl Into<TaskId>) -> Self {
        self.task_id = task_id.into();
        self
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

    pub fn into_task(self) -> Task {
        Task::new(self.task_id, self.original_request)
            .with_capabilities(self.capability_hint)
            .with_priority(self.priority)
    }
}

/// Handle to an orchestration running on its own tokio task.
pub struct OrchestrationHandle {
    pub(super) task_id: TaskId,
    pub(super) cancel: CancellationToken,
    pub(super) join: JoinHandle<OrchestrationReport>,
}

impl OrchestrationHandle {
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    /// Requests cancellation. The orchestration notifies its active
    /// assignee and fails with [`OrchestrationError::Cancelled`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Waits for the final report.
    pub async fn join(self) -> OrchestrationReport {
        match self.join.await {
            Ok(report) => report,
            Err(e) => {
                error!(task_id = %self.task_id, error = %e, "Orchestration task aborted");
                OrchestrationReport::aborted(self.task_id, OrchestrationError::Cancelled)
            }
        }
    }
}
