//! Orchestration driver: runs one task's state machine to a terminal phase.

use super::Supervisor;
use crate::use_cases::shared::{Inbox, WaitEvent};
use conductor_domain::{
    AgentId, AgentMessage, CorrelationId, Inbound, MessageType, OrchestrationError,
    OrchestrationReport, Outcome, Phase, ReactiveState, RecoveryDecision, StateError, Task,
};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Result of a single assignment attempt.
enum Attempt {
    Succeeded,
    /// The agent failed; self-healing decides what happens next
    Failed(OrchestrationError),
    /// The circuit refused the assignment before anything was sent
    Refused(OrchestrationError),
    /// Cancellation or orchestration timeout
    Aborted(OrchestrationError),
}

enum NextCandidate {
    Agent(AgentId),
    Exhausted,
    Aborted(OrchestrationError),
}

pub(super) struct Orchestration {
    supervisor: Supervisor,
    state: ReactiveState,
    inbox: Inbox,
    /// Agents whose circuit refused an assignment in this orchestration
    refused: HashSet<AgentId>,
}

impl Orchestration {
    pub(super) async fn start(supervisor: Supervisor, task: Task, cancel: CancellationToken) -> Self {
        let inbox = Inbox::open(
            &supervisor.bus,
            &task.task_id,
            supervisor.config.execution.orchestration_timeout,
            cancel,
        )
        .await;
        let state = ReactiveState::new(task);
        if let Some(initial) = state.checkpoints().first() {
            supervisor.sink.emit(initial);
        }
        Self {
            supervisor,
            state,
            inbox,
            refused: HashSet::new(),
        }
    }

    pub(super) async fn drive(mut self) -> OrchestrationReport {
        info!(
            task_id = %self.state.task_id(),
            hint = %self.state.capability_hint(),
            priority = ?self.state.priority(),
            "Orchestration started"
        );

        if let Err(reason) = self.execute().await {
            self.fail(reason);
        }
        self.inbox.close(&self.supervisor.bus).await;

        let report = self.state.report();
        info!(
            task_id = %report.task_id,
            phase = %report.phase,
            attempts = report.attempts.len(),
            errors = report.errors.len(),
            "Orchestration finished"
        );
        report
    }

    async fn execute(&mut self) -> Result<(), OrchestrationError> {
        self.advance(Phase::Broadcasting);
        let hint = self.state.capability_hint().clone();
        let candidates = self.supervisor.registry.find_capable_any(&hint).await;
        self.state.set_active_agents(candidates.iter().cloned());
        info!(
            task_id = %self.state.task_id(),
            candidates = candidates.len(),
            "Capable agents found"
        );

        let mut assignee = match candidates.as_slice() {
            [] => {
                return Err(OrchestrationError::NoCapableAgent {
                    hint: hint.to_string(),
                });
            }
            [only] => only.clone(),
            _ => {
                self.advance(Phase::Negotiating);
                self.negotiate(&candidates).await?
            }
        };

        loop {
            match self.attempt(&assignee).await {
                Attempt::Succeeded => break,
                Attempt::Aborted(reason) => return Err(reason),
                Attempt::Refused(reason) => {
                    warn!(task_id = %self.state.task_id(), agent_id = %assignee, "Circuit refused assignment");
                    self.state.record_error(Some(assignee.clone()), reason.clone());
                    self.refused.insert(assignee.clone());
                    assignee = self.fall_back(&assignee, reason).await?;
                }
                Attempt::Failed(reason) => {
                    let failures = self.state.increment_retry();
                    let decision = self
                        .supervisor
                        .healing
                        .decide(&assignee, &reason, failures)
                        .await;
                    match decision {
                        RecoveryDecision::Retry { delay } => {
                            info!(
                                task_id = %self.state.task_id(),
                                agent_id = %assignee,
                                delay_ms = delay.as_millis() as u64,
                                failures,
                                "Retrying assignment"
                            );
                            self.supervisor.progress.on_retry_scheduled(
                                self.state.task_id(),
                                &assignee,
                                delay,
                            );
                            self.back_off(delay).await?;
                        }
                        RecoveryDecision::Fallback => {
                            assignee = self.fall_back(&assignee, reason).await?;
                        }
                        RecoveryDecision::Degrade => return Err(reason),
                    }
                }
            }
        }

        self.advance(Phase::Aggregating);
        let payload = self.state.aggregate();
        self.complete(payload);
        Ok(())
    }

    async fn negotiate(&mut self, candidates: &[AgentId]) -> Result<AgentId, OrchestrationError> {
        let outcome = self
            .supervisor
            .broker
            .negotiate(&mut self.state, &mut self.inbox, candidates)
            .await?;
        self.supervisor
            .progress
            .on_negotiation_complete(self.state.task_id(), &outcome.ranking);
        let winner = outcome
            .winner()
            .cloned()
            .ok_or(OrchestrationError::NegotiationFailed {
                candidates: candidates.len(),
            })?;
        info!(
            task_id = %self.state.task_id(),
            round = outcome.round,
            winner = %winner,
            bids = outcome.ranking.len(),
            "Negotiation complete"
        );
        Ok(winner)
    }

    // ==================== Assignment ====================

    async fn attempt(&mut self, agent_id: &AgentId) -> Attempt {
        if let Some(reason) = self.inbox.interrupted() {
            return Attempt::Aborted(reason);
        }
        if !self.supervisor.healing.acquire(agent_id).await {
            return Attempt::Refused(OrchestrationError::CircuitOpen {
                agent_id: agent_id.clone(),
            });
        }

        self.advance(Phase::Executing);
        let request = AgentMessage::request(
            self.inbox.address().clone(),
            agent_id.clone(),
            json!({
                "task": self.state.task(),
                "query": self.state.original_request(),
                "attempt": self.state.total_attempts() + 1,
            }),
        );
        let correlation_id = request.correlation_id();
        self.state.record_outbound(request.clone());
        let attempt = match self.state.begin_assignment(agent_id, correlation_id) {
            Ok(assignment) => assignment.attempt,
            Err(e) => {
                error!(task_id = %self.state.task_id(), error = %e, "Assignment bookkeeping out of order");
                self.state.total_attempts()
            }
        };
        if let Err(e) = self.supervisor.registry.begin_assignment(agent_id).await {
            warn!(agent_id = %agent_id, error = %e, "Load not tracked");
        }
        info!(
            task_id = %self.state.task_id(),
            agent_id = %agent_id,
            attempt,
            "Assigned"
        );
        self.supervisor
            .progress
            .on_assignment(self.state.task_id(), agent_id, attempt);

        if let Err(e) = self.supervisor.bus.publish(request).await {
            // Monitoring is the only phase that leads on to a retry or fallback.
            self.advance(Phase::Monitoring);
            self.state.expire(correlation_id);
            let failure = OrchestrationError::AgentError {
                agent_id: agent_id.clone(),
                message: e.to_string(),
                retryable: false,
                details: Value::Null,
            };
            return self.conclude(agent_id, Err(failure)).await;
        }

        self.advance(Phase::Monitoring);
        let timeout = self.supervisor.config.execution.assignment_timeout;
        let deadline = Instant::now() + timeout;
        loop {
            match self.inbox.next(deadline).await {
                WaitEvent::Message(message) => match self.state.accept(message) {
                    Ok(Inbound::Reply(reply)) if reply.correlation_id() == correlation_id => {
                        let result = match reply.message_type() {
                            MessageType::Response => Ok(reply.content().clone()),
                            _ => Err(failure_from_reply(agent_id, &reply)),
                        };
                        return self.conclude(agent_id, result).await;
                    }
                    Ok(Inbound::Reply(reply)) => {
                        debug!(task_id = %self.state.task_id(), from = %reply.from(), "Stray reply ignored");
                    }
                    Ok(Inbound::Status(status)) => {
                        debug!(task_id = %self.state.task_id(), agent_id = %status.from(), "Status update");
                        self.supervisor
                            .progress
                            .on_agent_status(self.state.task_id(), &status);
                    }
                    Err(reason) => {
                        debug!(task_id = %self.state.task_id(), reason = %reason, "Message dropped");
                    }
                },
                WaitEvent::StepTimeout => {
                    self.notify_cancel(agent_id, correlation_id).await;
                    self.state.expire(correlation_id);
                    warn!(
                        task_id = %self.state.task_id(),
                        agent_id = %agent_id,
                        timeout_ms = timeout.as_millis() as u64,
                        "Assignment timed out"
                    );
                    let failure = OrchestrationError::AgentTimeout {
                        agent_id: agent_id.clone(),
                        timeout_ms: timeout.as_millis() as u64,
                    };
                    return self.conclude(agent_id, Err(failure)).await;
                }
                WaitEvent::OrchestrationTimeout => {
                    let reason = self.inbox.timeout_error();
                    self.abandon(agent_id, correlation_id, &reason).await;
                    return Attempt::Aborted(reason);
                }
                WaitEvent::Cancelled => {
                    let reason = OrchestrationError::Cancelled;
                    self.abandon(agent_id, correlation_id, &reason).await;
                    return Attempt::Aborted(reason);
                }
                WaitEvent::Closed => {
                    let reason = self.inbox.closed_error();
                    self.abandon(agent_id, correlation_id, &reason).await;
                    return Attempt::Aborted(reason);
                }
            }
        }
    }

    /// Bookkeeping for an assignment that produced an agent outcome.
    async fn conclude(
        &mut self,
        agent_id: &AgentId,
        result: Result<Value, OrchestrationError>,
    ) -> Attempt {
        let success = result.is_ok();
        let outcome = match &result {
            Ok(_) => Outcome::Success,
            Err(OrchestrationError::AgentTimeout { .. }) => Outcome::Timeout,
            Err(_) => Outcome::Error,
        };

        let registry = &self.supervisor.registry;
        if let Err(e) = registry.end_assignment(agent_id, success).await {
            warn!(agent_id = %agent_id, error = %e, "Load not released");
        }
        let status = self.supervisor.health.record(agent_id, outcome).await;
        if registry.set_status(agent_id, status).await.is_err() {
            debug!(agent_id = %agent_id, "Agent left the registry during assignment");
        }
        self.supervisor
            .progress
            .on_assignment_complete(self.state.task_id(), agent_id, success);

        match result {
            Ok(value) => {
                self.supervisor.healing.on_success(agent_id).await;
                self.state.finish_assignment(Ok(value));
                info!(task_id = %self.state.task_id(), agent_id = %agent_id, "Assignment succeeded");
                Attempt::Succeeded
            }
            Err(failure) => {
                warn!(
                    task_id = %self.state.task_id(),
                    agent_id = %agent_id,
                    error = %failure,
                    "Assignment failed"
                );
                self.state.record_error(Some(agent_id.clone()), failure.clone());
                self.state.finish_assignment(Err(&failure));
                Attempt::Failed(failure)
            }
        }
    }

    /// Drops an in-flight assignment without charging the agent.
    async fn abandon(
        &mut self,
        agent_id: &AgentId,
        correlation_id: CorrelationId,
        reason: &OrchestrationError,
    ) {
        if reason.is_cancelled() {
            self.notify_cancel(agent_id, correlation_id).await;
        }
        self.state.expire(correlation_id);
        self.state.finish_assignment(Err(reason));
        if self.supervisor.registry.release_assignment(agent_id).await.is_err() {
            debug!(agent_id = %agent_id, "Agent left the registry during assignment");
        }
        self.supervisor.healing.release(agent_id).await;
    }

    /// Tells the agent to stop working on the request behind `correlation_id`.
    async fn notify_cancel(&mut self, agent_id: &AgentId, correlation_id: CorrelationId) {
        let notice = AgentMessage::status(
            self.inbox.address().clone(),
            agent_id.clone(),
            correlation_id,
            json!({ "cancel": true, "task_id": self.state.task_id() }),
        );
        self.state.record_outbound(notice.clone());
        if let Err(e) = self.supervisor.bus.publish(notice).await {
            debug!(agent_id = %agent_id, error = %e, "Cancel notice not delivered");
        }
    }

    /// Sleeps for `delay` while draining (and dropping) late messages.
    async fn back_off(&mut self, delay: Duration) -> Result<(), OrchestrationError> {
        let until = Instant::now() + delay;
        loop {
            match self.inbox.next(until).await {
                WaitEvent::Message(message) => {
                    if let Err(reason) = self.state.accept(message) {
                        debug!(task_id = %self.state.task_id(), reason = %reason, "Message dropped");
                    }
                }
                WaitEvent::StepTimeout => return Ok(()),
                WaitEvent::OrchestrationTimeout => return Err(self.inbox.timeout_error()),
                WaitEvent::Cancelled => return Err(OrchestrationError::Cancelled),
                WaitEvent::Closed => return Err(self.inbox.closed_error()),
            }
        }
    }

    // ==================== Fallback ====================

    async fn fall_back(
        &mut self,
        failed: &AgentId,
        last_failure: OrchestrationError,
    ) -> Result<AgentId, OrchestrationError> {
        match self.next_candidate().await {
            NextCandidate::Agent(next) => {
                info!(
                    task_id = %self.state.task_id(),
                    from = %failed,
                    to = %next,
                    "Falling back"
                );
                self.state.reset_retry();
                self.supervisor
                    .progress
                    .on_fallback(self.state.task_id(), failed, &next);
                Ok(next)
            }
            NextCandidate::Exhausted => Err(self.exhausted(last_failure)),
            NextCandidate::Aborted(reason) => Err(reason),
        }
    }

    /// Next untried candidate: the best remaining ranked bidder whose
    /// circuit admits work, else the single untried capable agent, else a
    /// fresh negotiation among the untried ones.
    async fn next_candidate(&mut self) -> NextCandidate {
        let hint = self.state.capability_hint().clone();
        let untried: Vec<AgentId> = self
            .supervisor
            .registry
            .find_capable_any(&hint)
            .await
            .into_iter()
            .filter(|id| !self.state.was_tried(id) && !self.refused.contains(id))
            .collect();

        let ranked: Vec<AgentId> = self
            .state
            .ranking()
            .iter()
            .map(|scored| scored.agent_id().clone())
            .collect();
        for agent_id in ranked.iter().filter(|id| untried.contains(id)) {
            if self.supervisor.healing.can_assign(agent_id).await {
                return NextCandidate::Agent(agent_id.clone());
            }
        }

        let remaining: Vec<AgentId> = untried
            .into_iter()
            .filter(|id| !ranked.contains(id))
            .collect();
        match remaining.as_slice() {
            [] => NextCandidate::Exhausted,
            [only] => NextCandidate::Agent(only.clone()),
            _ => {
                if self.state.phase() != Phase::Negotiating {
                    self.advance(Phase::Negotiating);
                }
                match self.negotiate(&remaining).await {
                    Ok(winner) => NextCandidate::Agent(winner),
                    Err(OrchestrationError::NegotiationFailed { candidates }) => {
                        debug!(task_id = %self.state.task_id(), candidates, "Renegotiation produced no bids");
                        NextCandidate::Exhausted
                    }
                    Err(reason) => NextCandidate::Aborted(reason),
                }
            }
        }
    }

    /// Failure reason once no candidate is left.
    fn exhausted(&self, last_failure: OrchestrationError) -> OrchestrationError {
        match last_failure {
            OrchestrationError::CircuitOpen { .. } => last_failure,
            failure if failure.is_retryable() => OrchestrationError::MaxRetriesExceeded {
                attempts: self.state.total_attempts(),
            },
            failure => failure,
        }
    }

    // ==================== Phase bookkeeping ====================

    fn advance(&mut self, next: Phase) {
        let from = self.state.phase();
        let result = self.state.transition(next).cloned();
        self.after_transition(from, result);
    }

    fn complete(&mut self, payload: Value) {
        let from = self.state.phase();
        let result = self.state.complete(payload).cloned();
        self.after_transition(from, result);
    }

    fn fail(&mut self, reason: OrchestrationError) {
        if self.state.is_terminal() {
            return;
        }
        warn!(task_id = %self.state.task_id(), reason = %reason, "Orchestration failed");
        self.supervisor
            .progress
            .on_failed(self.state.task_id(), &reason);
        let from = self.state.phase();
        let result = self.state.fail(reason).cloned();
        self.after_transition(from, result);
    }

    fn after_transition(
        &self,
        from: Phase,
        result: Result<conductor_domain::Checkpoint, StateError>,
    ) {
        match result {
            Ok(checkpoint) => {
                info!(
                    task_id = %checkpoint.task_id,
                    from = %from,
                    to = %checkpoint.phase,
                    "Phase transition"
                );
                self.supervisor.sink.emit(&checkpoint);
                self.supervisor
                    .progress
                    .on_phase_change(&checkpoint.task_id, from, checkpoint.phase);
            }
            Err(e) => {
                error!(task_id = %self.state.task_id(), error = %e, "Phase transition rejected");
            }
        }
    }
}

/// Maps an `error` reply to the orchestration error it represents.
fn failure_from_reply(agent_id: &AgentId, reply: &AgentMessage) -> OrchestrationError {
    let content = reply.content();
    let message = content
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unspecified agent error")
        .to_string();
    if content.get("protocol_violation").and_then(Value::as_bool) == Some(true) {
        return OrchestrationError::AgentProtocolViolation {
            agent_id: agent_id.clone(),
            reason: message,
        };
    }
    OrchestrationError::AgentError {
        agent_id: agent_id.clone(),
        message,
        retryable: content
            .get("retryable")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        details: content.get("details").cloned().unwrap_or(Value::Null),
    }
}
