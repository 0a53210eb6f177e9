//! Orchestration domain entities
//!
//! [`ReactiveState`] is the single source of truth for one orchestration
//! instance. It is owned exclusively by the supervisor driving it; agents only
//! ever see the [`Task`] view.

use crate::agent::task::{Priority, Task};
use crate::core::capability::CapabilitySet;
use crate::core::error::OrchestrationError;
use crate::core::ids::{AgentId, CorrelationId, TaskId};
use crate::message::{AgentMessage, MessageType};
use crate::negotiation::ScoredBid;
use crate::orchestration::value_objects::{
    Checkpoint, ErrorRecord, OrchestrationOutcome, OrchestrationReport,
};
use crate::util::current_timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use thiserror::Error;

/// Phase of an orchestration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Building state from the submitted task
    Initializing,
    /// Looking up capable agents
    Broadcasting,
    /// Collecting bids from several candidates
    Negotiating,
    /// Sending the request to the assignee
    Executing,
    /// Waiting for the assignee's terminal reply
    Monitoring,
    /// Merging results into the final payload
    Aggregating,
    Completed,
    Failed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Initializing => "INITIALIZING",
            Phase::Broadcasting => "BROADCASTING",
            Phase::Negotiating => "NEGOTIATING",
            Phase::Executing => "EXECUTING",
            Phase::Monitoring => "MONITORING",
            Phase::Aggregating => "AGGREGATING",
            Phase::Completed => "COMPLETED",
            Phase::Failed => "FAILED",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Phase::Initializing => "Initializing",
            Phase::Broadcasting => "Finding capable agents",
            Phase::Negotiating => "Negotiating",
            Phase::Executing => "Executing",
            Phase::Monitoring => "Monitoring",
            Phase::Aggregating => "Aggregating",
            Phase::Completed => "Completed",
            Phase::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed)
    }

    /// Allowed edges of the state machine. `Failed` is reachable from every
    /// non-terminal phase; terminal phases have no successors.
    pub fn can_transition_to(&self, next: Phase) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == Phase::Failed {
            return true;
        }
        matches!(
            (self, next),
            (Phase::Initializing, Phase::Broadcasting)
                | (Phase::Broadcasting, Phase::Negotiating)
                | (Phase::Broadcasting, Phase::Executing)
                | (Phase::Negotiating, Phase::Executing)
                | (Phase::Executing, Phase::Monitoring)
                | (Phase::Monitoring, Phase::Executing)
                | (Phase::Monitoring, Phase::Negotiating)
                | (Phase::Monitoring, Phase::Aggregating)
                | (Phase::Aggregating, Phase::Completed)
        )
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateError {
    #[error("Invalid phase transition {from} -> {to}")]
    InvalidTransition { from: Phase, to: Phase },

    #[error("Orchestration already terminated in {0}")]
    Terminated(Phase),

    #[error("Agent {0} still holds the active assignment")]
    AssignmentActive(AgentId),
}

/// What an agent is doing for this orchestration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeStatus {
    #[default]
    Idle,
    Negotiating,
    Assigned,
    Completed,
    Failed,
}

/// Per-agent bookkeeping inside one orchestration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentRuntimeState {
    pub status: RuntimeStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
}

/// The currently active assignment. There is at most one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub agent_id: AgentId,
    pub correlation_id: CorrelationId,
    /// Overall attempt number across all agents, starting at 1
    pub attempt: u32,
    pub started_at: u64,
}

/// An inbound message that passed correlation checks.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Response, error or bid; its correlation is now resolved
    Reply(AgentMessage),
    /// Status update for a still-pending correlation
    Status(AgentMessage),
}

/// Why an inbound message was dropped without touching state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Terminated,
    UnknownCorrelation,
    AlreadyResolved,
    UnexpectedSender,
    UnexpectedType,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::Terminated => "orchestration terminated",
            DropReason::UnknownCorrelation => "unknown correlation id",
            DropReason::AlreadyResolved => "correlation already resolved",
            DropReason::UnexpectedSender => "unexpected sender",
            DropReason::UnexpectedType => "unexpected message type",
        }
    }
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// State of one orchestration instance.
#[derive(Debug, Clone)]
pub struct ReactiveState {
    task: Task,
    phase: Phase,
    message_log: Vec<AgentMessage>,
    pending: HashMap<CorrelationId, AgentMessage>,
    resolved: HashSet<CorrelationId>,
    agent_states: BTreeMap<AgentId, AgentRuntimeState>,
    active_agents: BTreeSet<AgentId>,
    results: BTreeMap<String, Value>,
    errors: Vec<ErrorRecord>,
    retry_count: u32,
    checkpoints: Vec<Checkpoint>,
    negotiation_rounds: u32,
    ranking: Vec<ScoredBid>,
    attempts: Vec<AgentId>,
    assignment: Option<Assignment>,
    outcome: Option<OrchestrationOutcome>,
    created_at: u64,
}

impl ReactiveState {
    /// Builds the state in `Initializing` and records the initial checkpoint.
    pub fn new(task: Task) -> Self {
        let mut state = Self {
            task,
            phase: Phase::Initializing,
            message_log: Vec::new(),
            pending: HashMap::new(),
            resolved: HashSet::new(),
            agent_states: BTreeMap::new(),
            active_agents: BTreeSet::new(),
            results: BTreeMap::new(),
            errors: Vec::new(),
            retry_count: 0,
            checkpoints: Vec::new(),
            negotiation_rounds: 0,
            ranking: Vec::new(),
            attempts: Vec::new(),
            assignment: None,
            outcome: None,
            created_at: current_timestamp(),
        };
        state.push_checkpoint();
        state
    }

    // ==================== Accessors ====================

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task.task_id
    }

    pub fn original_request(&self) -> &str {
        &self.task.request
    }

    pub fn capability_hint(&self) -> &CapabilitySet {
        &self.task.capability_hint
    }

    pub fn priority(&self) -> Priority {
        self.task.priority
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn message_log(&self) -> &[AgentMessage] {
        &self.message_log
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, correlation_id: &CorrelationId) -> bool {
        self.pending.contains_key(correlation_id)
    }

    pub fn agent_state(&self, agent_id: &AgentId) -> Option<&AgentRuntimeState> {
        self.agent_states.get(agent_id)
    }

    pub fn active_agents(&self) -> impl Iterator<Item = &AgentId> {
        self.active_agents.iter()
    }

    pub fn results(&self) -> &BTreeMap<String, Value> {
        &self.results
    }

    pub fn errors(&self) -> &[ErrorRecord] {
        &self.errors
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn negotiation_rounds(&self) -> u32 {
        self.negotiation_rounds
    }

    pub fn ranking(&self) -> &[ScoredBid] {
        &self.ranking
    }

    pub fn assignment(&self) -> Option<&Assignment> {
        self.assignment.as_ref()
    }

    /// Agents in assignment order; retries repeat the id.
    pub fn attempts(&self) -> &[AgentId] {
        &self.attempts
    }

    pub fn total_attempts(&self) -> u32 {
        self.attempts.len() as u32
    }

    pub fn was_tried(&self, agent_id: &AgentId) -> bool {
        self.attempts.contains(agent_id)
    }

    pub fn outcome(&self) -> Option<&OrchestrationOutcome> {
        self.outcome.as_ref()
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    // ==================== Phase transitions ====================

    /// Moves to `next` and appends a checkpoint.
    pub fn transition(&mut self, next: Phase) -> Result<&Checkpoint, StateError> {
        if self.phase.is_terminal() {
            return Err(StateError::Terminated(self.phase));
        }
        if !self.phase.can_transition_to(next) {
            return Err(StateError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        self.phase = next;
        Ok(self.push_checkpoint())
    }

    /// Terminates in `Failed` with `reason`.
    ///
    /// The reason is appended to the error list unless it is the most recent
    /// entry already. Pending correlations are resolved so nothing can be
    /// accepted afterwards.
    pub fn fail(&mut self, reason: OrchestrationError) -> Result<&Checkpoint, StateError> {
        if self.phase.is_terminal() {
            return Err(StateError::Terminated(self.phase));
        }
        if self.errors.last().map(|record| &record.error) != Some(&reason) {
            let agent_id = reason.agent_id().cloned();
            self.record_error(agent_id, reason.clone());
        }
        if let Some(assignment) = self.assignment.take()
            && let Some(agent) = self.agent_states.get_mut(&assignment.agent_id)
        {
            agent.status = RuntimeStatus::Failed;
        }
        self.resolve_all_pending();
        self.outcome = Some(OrchestrationOutcome::Failed {
            reason,
            attempts: self.total_attempts(),
        });
        self.transition(Phase::Failed)
    }

    /// Terminates in `Completed` with the aggregated `result`.
    pub fn complete(&mut self, result: Value) -> Result<&Checkpoint, StateError> {
        if self.phase != Phase::Aggregating {
            return Err(StateError::InvalidTransition {
                from: self.phase,
                to: Phase::Completed,
            });
        }
        self.resolve_all_pending();
        self.outcome = Some(OrchestrationOutcome::Completed { result });
        self.transition(Phase::Completed)
    }

    fn push_checkpoint(&mut self) -> &Checkpoint {
        let checkpoint = Checkpoint {
            task_id: self.task.task_id.clone(),
            phase: self.phase,
            timestamp: current_timestamp(),
            results_so_far: self.results.clone(),
            errors_so_far: self.errors.clone(),
            retry_count: self.retry_count,
            active_agents: self.active_agents.iter().cloned().collect(),
            assignee: self.assignment.as_ref().map(|a| a.agent_id.clone()),
        };
        self.checkpoints.push(checkpoint);
        &self.checkpoints[self.checkpoints.len() - 1]
    }

    // ==================== Messages ====================

    /// Logs an outbound message. Requests and negotiates open a pending
    /// correlation.
    pub fn record_outbound(&mut self, message: AgentMessage) {
        if self.phase.is_terminal() {
            return;
        }
        if message.message_type().expects_reply() {
            if message.message_type() == MessageType::Negotiate {
                self.agent_states
                    .entry(message.to().clone())
                    .or_default()
                    .status = RuntimeStatus::Negotiating;
            }
            self.pending.insert(message.correlation_id(), message.clone());
        }
        self.message_log.push(message);
    }

    /// Validates an inbound message against the correlation table.
    ///
    /// Dropped messages leave the state untouched. Accepted replies resolve
    /// their correlation, so a re-delivered copy is dropped the second time.
    pub fn accept(&mut self, message: AgentMessage) -> Result<Inbound, DropReason> {
        if self.phase.is_terminal() {
            return Err(DropReason::Terminated);
        }
        let correlation_id = message.correlation_id();
        if self.resolved.contains(&correlation_id) {
            return Err(DropReason::AlreadyResolved);
        }
        let request = self
            .pending
            .get(&correlation_id)
            .ok_or(DropReason::UnknownCorrelation)?;
        if message.from() != request.to() {
            return Err(DropReason::UnexpectedSender);
        }
        let request_type = request.message_type();

        match message.message_type() {
            MessageType::Status => {
                self.message_log.push(message.clone());
                Ok(Inbound::Status(message))
            }
            kind if kind.answers(request_type) => {
                self.pending.remove(&correlation_id);
                self.resolved.insert(correlation_id);
                if let Some(agent) = self.agent_states.get_mut(message.from())
                    && agent.status == RuntimeStatus::Negotiating
                {
                    agent.status = RuntimeStatus::Idle;
                }
                self.message_log.push(message.clone());
                Ok(Inbound::Reply(message))
            }
            _ => Err(DropReason::UnexpectedType),
        }
    }

    /// Gives up on a pending correlation (timeout). Late replies are dropped
    /// as already resolved.
    pub fn expire(&mut self, correlation_id: CorrelationId) -> Option<AgentMessage> {
        let request = self.pending.remove(&correlation_id)?;
        self.resolved.insert(correlation_id);
        if let Some(agent) = self.agent_states.get_mut(request.to())
            && agent.status == RuntimeStatus::Negotiating
        {
            agent.status = RuntimeStatus::Idle;
        }
        Some(request)
    }

    fn resolve_all_pending(&mut self) {
        let open: Vec<CorrelationId> = self.pending.keys().copied().collect();
        for correlation_id in open {
            self.expire(correlation_id);
        }
    }

    // ==================== Negotiation ====================

    /// Starts a new bid-collection round and returns its number.
    pub fn begin_negotiation_round(&mut self) -> u32 {
        self.negotiation_rounds += 1;
        self.negotiation_rounds
    }

    pub fn set_ranking(&mut self, ranking: Vec<ScoredBid>) {
        self.ranking = ranking;
    }

    pub fn set_active_agents(&mut self, agents: impl IntoIterator<Item = AgentId>) {
        self.active_agents = agents.into_iter().collect();
        for agent_id in &self.active_agents {
            self.agent_states.entry(agent_id.clone()).or_default();
        }
    }

    // ==================== Assignments ====================

    /// Records the start of an assignment for the request with
    /// `correlation_id`. Replaces nothing: the previous assignment must have
    /// been finished first.
    pub fn begin_assignment(
        &mut self,
        agent_id: &AgentId,
        correlation_id: CorrelationId,
    ) -> Result<&Assignment, StateError> {
        if self.phase.is_terminal() {
            return Err(StateError::Terminated(self.phase));
        }
        if let Some(active) = &self.assignment {
            return Err(StateError::AssignmentActive(active.agent_id.clone()));
        }
        self.attempts.push(agent_id.clone());
        let agent = self.agent_states.entry(agent_id.clone()).or_default();
        agent.status = RuntimeStatus::Assigned;
        agent.attempts += 1;
        self.active_agents.insert(agent_id.clone());
        Ok(&*self.assignment.insert(Assignment {
            agent_id: agent_id.clone(),
            correlation_id,
            attempt: self.attempts.len() as u32,
            started_at: current_timestamp(),
        }))
    }

    /// Ends the active assignment, storing the output on success.
    pub fn finish_assignment(&mut self, output: Result<Value, &OrchestrationError>) {
        let Some(assignment) = self.assignment.take() else {
            return;
        };
        let agent = self.agent_states.entry(assignment.agent_id.clone()).or_default();
        match output {
            Ok(value) => {
                agent.status = RuntimeStatus::Completed;
                self.results.insert(assignment.agent_id.to_string(), value);
            }
            Err(error) => {
                agent.status = RuntimeStatus::Failed;
                agent.last_error = Some(error.to_string());
            }
        }
    }

    pub fn record_error(&mut self, agent_id: Option<AgentId>, error: OrchestrationError) {
        let attempt = self
            .assignment
            .as_ref()
            .map(|a| a.attempt)
            .unwrap_or_else(|| self.total_attempts());
        self.errors.push(ErrorRecord::new(agent_id, attempt, error));
    }

    /// Counts a failed attempt against the current assignee.
    pub fn increment_retry(&mut self) -> u32 {
        self.retry_count += 1;
        self.retry_count
    }

    pub fn reset_retry(&mut self) {
        self.retry_count = 0;
    }

    // ==================== Results ====================

    /// Merged result payload: `{total_agents, successful_agents, results}`.
    pub fn aggregate(&self) -> Value {
        let tried: BTreeSet<&AgentId> = self.attempts.iter().collect();
        json!({
            "task_id": self.task.task_id,
            "total_agents": tried.len(),
            "successful_agents": self.results.len(),
            "results": self.results,
        })
    }

    pub fn report(&self) -> OrchestrationReport {
        let outcome = self.outcome.clone().unwrap_or(OrchestrationOutcome::Failed {
            reason: OrchestrationError::Cancelled,
            attempts: self.total_attempts(),
        });
        OrchestrationReport {
            task_id: self.task.task_id.clone(),
            phase: self.phase,
            outcome,
            results: self.results.clone(),
            errors: self.errors.clone(),
            attempts: self.attempts.clone(),
            negotiation_rounds: self.negotiation_rounds,
            checkpoints: self.checkpoints.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supervisor() -> AgentId {
        AgentId::supervisor_inbox(&TaskId::new("t1"))
    }

    fn state() -> ReactiveState {
        ReactiveState::new(Task::new("t1", "find flights").with_capability("research"))
    }

    fn request_to(agent: &str) -> AgentMessage {
        AgentMessage::request(supervisor(), AgentId::new(agent), json!({}))
    }

    #[test]
    fn test_new_state_has_initial_checkpoint() {
        let state = state();
        assert_eq!(state.phase(), Phase::Initializing);
        assert_eq!(state.checkpoints().len(), 1);
        assert_eq!(state.checkpoints()[0].phase, Phase::Initializing);
    }

    #[test]
    fn test_valid_transitions_append_checkpoints() {
        let mut state = state();
        state.transition(Phase::Broadcasting).unwrap();
        state.transition(Phase::Negotiating).unwrap();
        state.transition(Phase::Executing).unwrap();
        state.transition(Phase::Monitoring).unwrap();
        state.transition(Phase::Aggregating).unwrap();
        state.complete(json!({"ok": true})).unwrap();

        let phases: Vec<Phase> = state.checkpoints().iter().map(|c| c.phase).collect();
        assert_eq!(
            phases,
            vec![
                Phase::Initializing,
                Phase::Broadcasting,
                Phase::Negotiating,
                Phase::Executing,
                Phase::Monitoring,
                Phase::Aggregating,
                Phase::Completed,
            ]
        );
        assert!(state.report().is_success());
    }

    #[test]
    fn test_invalid_transition_is_rejected() {
        let mut state = state();
        let err = state.transition(Phase::Executing).unwrap_err();
        assert_eq!(
            err,
            StateError::InvalidTransition {
                from: Phase::Initializing,
                to: Phase::Executing
            }
        );
        assert_eq!(state.checkpoints().len(), 1);
    }

    #[test]
    fn test_failed_reachable_from_any_non_terminal_phase() {
        for phase in [
            Phase::Initializing,
            Phase::Broadcasting,
            Phase::Negotiating,
            Phase::Executing,
            Phase::Monitoring,
            Phase::Aggregating,
        ] {
            assert!(phase.can_transition_to(Phase::Failed), "{phase}");
        }
        assert!(!Phase::Completed.can_transition_to(Phase::Failed));
        assert!(!Phase::Failed.can_transition_to(Phase::Broadcasting));
    }

    #[test]
    fn test_accept_reply_resolves_correlation() {
        let mut state = state();
        let request = request_to("a");
        state.record_outbound(request.clone());
        assert_eq!(state.pending_count(), 1);

        let reply = request.reply(MessageType::Response, json!({"ok": true}));
        assert!(matches!(state.accept(reply.clone()), Ok(Inbound::Reply(_))));
        assert_eq!(state.pending_count(), 0);
        assert_eq!(state.message_log().len(), 2);

        // Re-delivery is a no-op
        assert_eq!(state.accept(reply), Err(DropReason::AlreadyResolved));
        assert_eq!(state.message_log().len(), 2);
    }

    #[test]
    fn test_unknown_correlation_is_dropped_without_mutation() {
        let mut state = state();
        let stray = request_to("a").reply(MessageType::Bid, json!({"confidence": 0.9}));
        let log_before = state.message_log().len();
        let checkpoints_before = state.checkpoints().len();

        assert_eq!(state.accept(stray), Err(DropReason::UnknownCorrelation));
        assert_eq!(state.message_log().len(), log_before);
        assert_eq!(state.checkpoints().len(), checkpoints_before);
        assert!(state.errors().is_empty());
    }

    #[test]
    fn test_reply_from_wrong_sender_is_dropped() {
        let mut state = state();
        let request = request_to("a");
        state.record_outbound(request.clone());
        let mut wire = request.reply(MessageType::Response, json!({})).to_json();
        wire["from"] = json!("b");
        let forged = AgentMessage::from_json(&wire.to_string()).unwrap();

        assert_eq!(state.accept(forged), Err(DropReason::UnexpectedSender));
        assert!(state.is_pending(&request.correlation_id()));
    }

    #[test]
    fn test_status_does_not_resolve() {
        let mut state = state();
        let request = request_to("a");
        state.record_outbound(request.clone());
        let status = request.reply(MessageType::Status, json!({"progress": 0.5}));

        assert!(matches!(state.accept(status), Ok(Inbound::Status(_))));
        assert!(state.is_pending(&request.correlation_id()));
    }

    #[test]
    fn test_bid_to_request_is_unexpected() {
        let mut state = state();
        let request = request_to("a");
        state.record_outbound(request.clone());
        let bid = request.reply(MessageType::Bid, json!({"confidence": 1.0}));
        assert_eq!(state.accept(bid), Err(DropReason::UnexpectedType));
        assert!(state.is_pending(&request.correlation_id()));
    }

    #[test]
    fn test_expired_correlation_drops_late_reply() {
        let mut state = state();
        let request = request_to("a");
        state.record_outbound(request.clone());
        assert!(state.expire(request.correlation_id()).is_some());

        let late = request.reply(MessageType::Response, json!({}));
        assert_eq!(state.accept(late), Err(DropReason::AlreadyResolved));
    }

    #[test]
    fn test_terminal_state_accepts_nothing() {
        let mut state = state();
        let request = request_to("a");
        state.record_outbound(request.clone());
        state
            .fail(OrchestrationError::NoCapableAgent {
                hint: "research".into(),
            })
            .unwrap();

        let reply = request.reply(MessageType::Response, json!({}));
        assert_eq!(state.accept(reply), Err(DropReason::Terminated));
        assert!(state.transition(Phase::Broadcasting).is_err());
    }

    #[test]
    fn test_single_active_assignment() {
        let mut state = state();
        let first = CorrelationId::generate();
        state.begin_assignment(&AgentId::new("a"), first).unwrap();
        assert_eq!(
            state.begin_assignment(&AgentId::new("b"), CorrelationId::generate()),
            Err(StateError::AssignmentActive(AgentId::new("a")))
        );

        state.finish_assignment(Ok(json!({"answer": 42})));
        let second = state
            .begin_assignment(&AgentId::new("b"), CorrelationId::generate())
            .unwrap();
        assert_eq!(second.attempt, 2);
        assert_eq!(state.attempts(), &[AgentId::new("a"), AgentId::new("b")]);
        assert_eq!(state.results()["a"], json!({"answer": 42}));
    }

    #[test]
    fn test_fail_records_reason_once() {
        let mut state = state();
        let timeout = OrchestrationError::AgentTimeout {
            agent_id: AgentId::new("a"),
            timeout_ms: 10,
        };
        state.record_error(Some(AgentId::new("a")), timeout.clone());
        state.fail(timeout.clone()).unwrap();

        assert_eq!(state.errors().len(), 1);
        let report = state.report();
        assert_eq!(report.failure_reason(), Some(&timeout));
        assert_eq!(report.phase, Phase::Failed);
    }

    #[test]
    fn test_aggregate_payload() {
        let mut state = state();
        state
            .begin_assignment(&AgentId::new("a"), CorrelationId::generate())
            .unwrap();
        state.finish_assignment(Err(&OrchestrationError::Cancelled));
        state
            .begin_assignment(&AgentId::new("b"), CorrelationId::generate())
            .unwrap();
        state.finish_assignment(Ok(json!("done")));

        let payload = state.aggregate();
        assert_eq!(payload["total_agents"], 2);
        assert_eq!(payload["successful_agents"], 1);
        assert_eq!(payload["results"]["b"], "done");
        assert_eq!(
            state.agent_state(&AgentId::new("a")).unwrap().status,
            RuntimeStatus::Failed
        );
    }
}
