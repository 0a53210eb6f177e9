//! Progress notification port
//!
//! Defines the interface for reporting progress while an orchestration runs.

use conductor_domain::{AgentId, AgentMessage, OrchestrationError, Phase, ScoredBid, TaskId};
use std::time::Duration;

/// Callback for progress updates during an orchestration
///
/// Implementations live in the presentation layer and can display
/// progress in various ways (console, web UI, etc.)
pub trait ProgressNotifier: Send + Sync {
    /// Called on every phase transition
    fn on_phase_change(&self, task_id: &TaskId, from: Phase, to: Phase);

    /// Called when an agent receives an assignment
    fn on_assignment(&self, task_id: &TaskId, agent_id: &AgentId, attempt: u32);

    /// Called when an assignment finishes
    fn on_assignment_complete(&self, task_id: &TaskId, agent_id: &AgentId, success: bool);

    // ==================== Optional Callbacks ====================

    /// Called when a negotiation round produced a ranking.
    fn on_negotiation_complete(&self, _task_id: &TaskId, _ranking: &[ScoredBid]) {}

    /// Called for intermediate `status` messages from the assignee.
    fn on_agent_status(&self, _task_id: &TaskId, _message: &AgentMessage) {}

    /// Called when a failed attempt will be retried after `delay`.
    fn on_retry_scheduled(&self, _task_id: &TaskId, _agent_id: &AgentId, _delay: Duration) {}

    /// Called when the orchestration moves to another candidate.
    fn on_fallback(&self, _task_id: &TaskId, _from: &AgentId, _to: &AgentId) {}

    /// Called with the terminal error when the orchestration fails.
    fn on_failed(&self, _task_id: &TaskId, _reason: &OrchestrationError) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl ProgressNotifier for NoProgress {
    fn on_phase_change(&self, _task_id: &TaskId, _from: Phase, _to: Phase) {}
    fn on_assignment(&self, _task_id: &TaskId, _agent_id: &AgentId, _attempt: u32) {}
    fn on_assignment_complete(&self, _task_id: &TaskId, _agent_id: &AgentId, _success: bool) {}
}
