//! Negotiation broker
//!
//! Runs one bid-collection round: sends `negotiate` to every candidate in
//! parallel, collects bids until every candidate has answered or the bid
//! window closes, then ranks the bids against the registry's load and
//! success-rate figures.

use super::shared::{Inbox, WaitEvent};
use crate::services::agent_registry::AgentRegistry;
use crate::services::message_bus::MessageBus;
use conductor_domain::{
    AgentId, AgentMessage, Bid, CorrelationId, Inbound, MessageType, NegotiationOutcome,
    OrchestrationError, ReactiveState, rank_bids,
};
use futures::future::join_all;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub struct NegotiationBroker {
    bus: MessageBus,
    registry: Arc<AgentRegistry>,
    bid_timeout: Duration,
}

impl NegotiationBroker {
    pub fn new(bus: MessageBus, registry: Arc<AgentRegistry>, bid_timeout: Duration) -> Self {
        Self {
            bus,
            registry,
            bid_timeout,
        }
    }

    pub fn bid_timeout(&self) -> Duration {
        self.bid_timeout
    }

    /// Runs a round with `candidates` and stores the ranking on `state`.
    ///
    /// Candidates that decline (reply with an error), send an invalid bid or
    /// stay silent past the window are left out of the ranking. Zero bids
    /// fails with [`OrchestrationError::NegotiationFailed`].
    pub(crate) async fn negotiate(
        &self,
        state: &mut ReactiveState,
        inbox: &mut Inbox,
        candidates: &[AgentId],
    ) -> Result<NegotiationOutcome, OrchestrationError> {
        let round = state.begin_negotiation_round();
        let task_id = state.task_id().clone();
        info!(
            task_id = %task_id,
            round,
            candidates = candidates.len(),
            "Collecting bids"
        );

        let content = json!({ "task": state.task() });
        let requests: Vec<AgentMessage> = candidates
            .iter()
            .map(|candidate| {
                AgentMessage::negotiate(inbox.address().clone(), candidate.clone(), content.clone())
            })
            .collect();
        for request in &requests {
            state.record_outbound(request.clone());
        }

        let deliveries = join_all(requests.into_iter().map(|request| {
            let bus = self.bus.clone();
            async move {
                let correlation_id = request.correlation_id();
                let to = request.to().clone();
                (correlation_id, to, bus.publish(request).await)
            }
        }))
        .await;

        let mut outstanding: HashMap<CorrelationId, AgentId> = HashMap::new();
        for (correlation_id, agent_id, delivery) in deliveries {
            match delivery {
                Ok(()) => {
                    outstanding.insert(correlation_id, agent_id);
                }
                Err(e) => {
                    warn!(task_id = %task_id, agent_id = %agent_id, error = %e, "Negotiate not delivered");
                    state.expire(correlation_id);
                }
            }
        }

        let window = Instant::now() + self.bid_timeout;
        let mut bids = Vec::new();
        while !outstanding.is_empty() {
            match inbox.next(window).await {
                WaitEvent::Message(message) => match state.accept(message) {
                    Ok(Inbound::Reply(reply)) => {
                        outstanding.remove(&reply.correlation_id());
                        if reply.message_type() != MessageType::Bid {
                            debug!(task_id = %task_id, agent_id = %reply.from(), "Candidate declined");
                            continue;
                        }
                        match Bid::from_message(&reply) {
                            Ok(bid) => {
                                debug!(
                                    task_id = %task_id,
                                    agent_id = %bid.agent_id,
                                    correlation_id = %bid.correlation_id,
                                    confidence = bid.confidence,
                                    "Bid received"
                                );
                                bids.push(bid);
                            }
                            Err(e) => {
                                warn!(task_id = %task_id, agent_id = %reply.from(), error = %e, "Invalid bid ignored");
                            }
                        }
                    }
                    Ok(Inbound::Status(_)) => {}
                    Err(reason) => debug!(task_id = %task_id, reason = %reason, "Message dropped"),
                },
                WaitEvent::StepTimeout => break,
                WaitEvent::OrchestrationTimeout => return Err(inbox.timeout_error()),
                WaitEvent::Cancelled => return Err(OrchestrationError::Cancelled),
                WaitEvent::Closed => return Err(inbox.closed_error()),
            }
        }

        let mut missing: Vec<AgentId> = Vec::with_capacity(outstanding.len());
        for (correlation_id, agent_id) in outstanding {
            state.expire(correlation_id);
            missing.push(agent_id);
        }
        missing.sort();
        if !missing.is_empty() {
            info!(task_id = %task_id, round, missing = missing.len(), "Bid window closed");
        }

        let ranking = rank_bids(bids, &self.registry.descriptors().await);
        if ranking.is_empty() {
            return Err(OrchestrationError::NegotiationFailed {
                candidates: candidates.len(),
            });
        }
        state.set_ranking(ranking.clone());

        Ok(NegotiationOutcome {
            round,
            ranking,
            missing,
        })
    }
}
