//! Bids and bid ranking

use crate::agent::descriptor::AgentDescriptor;
use crate::core::error::MessageError;
use crate::core::ids::{AgentId, CorrelationId};
use crate::message::{AgentMessage, MessageType};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;

/// A candidate's answer to a negotiate message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    pub agent_id: AgentId,
    /// Self-assessed fitness in `[0, 1]`
    pub confidence: f64,
    /// Optional cost estimate (seconds of work for the bundled agents)
    pub estimated_cost: Option<f64>,
    /// Correlation of the negotiate message this bid answers
    pub correlation_id: CorrelationId,
}

impl Bid {
    pub fn new(agent_id: impl Into<AgentId>, confidence: f64) -> Self {
        Self {
            agent_id: agent_id.into(),
            confidence: clamp_confidence(confidence),
            estimated_cost: None,
            correlation_id: CorrelationId::generate(),
        }
    }

    pub fn with_estimated_cost(mut self, cost: f64) -> Self {
        self.estimated_cost = Some(cost);
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    /// Content payload of a bid message.
    pub fn content(confidence: f64, estimated_cost: Option<f64>) -> Value {
        json!({
            "confidence": clamp_confidence(confidence),
            "estimated_cost": estimated_cost,
        })
    }

    /// Extracts a bid from a `bid` message; the sender becomes the bidder and
    /// the reply's correlation id ties it to its negotiate message.
    pub fn from_message(message: &AgentMessage) -> Result<Self, MessageError> {
        if message.message_type() != MessageType::Bid {
            return Err(MessageError::InvalidBid(format!(
                "expected bid, got {}",
                message.message_type()
            )));
        }
        let confidence = message
            .content()
            .get("confidence")
            .and_then(Value::as_f64)
            .ok_or_else(|| MessageError::InvalidBid("missing numeric 'confidence'".to_string()))?;
        if !confidence.is_finite() {
            return Err(MessageError::InvalidBid("confidence is not finite".to_string()));
        }
        let estimated_cost = message.content().get("estimated_cost").and_then(Value::as_f64);

        Ok(Self {
            agent_id: message.from().clone(),
            confidence: clamp_confidence(confidence),
            estimated_cost,
            correlation_id: message.correlation_id(),
        })
    }
}

fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() { 0.0 } else { confidence.clamp(0.0, 1.0) }
}

/// Bid scoring: `confidence × (1 − load) × success_rate`.
pub fn score(confidence: f64, load: f64, success_rate: f64) -> f64 {
    confidence * (1.0 - load) * success_rate
}

/// A bid together with the registry inputs it was scored against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredBid {
    pub bid: Bid,
    pub load: f64,
    pub success_rate: f64,
    pub score: f64,
}

impl ScoredBid {
    pub fn agent_id(&self) -> &AgentId {
        &self.bid.agent_id
    }
}

/// Scores and orders bids: highest score first, ties broken by the
/// lexicographically smallest agent id.
///
/// Bids from agents missing in `descriptors` are discarded. Duplicate bids
/// from the same agent keep the first one.
///
/// # Example
///
/// ```
/// use conductor_domain::{AgentDescriptor, AgentId, Bid, CapabilitySet, rank_bids};
/// use std::collections::HashMap;
///
/// let mut descriptors = HashMap::new();
/// for (id, load) in [("a", 0.1), ("b", 0.0)] {
///     descriptors.insert(
///         AgentId::new(id),
///         AgentDescriptor::new(id, CapabilitySet::new()).with_load(load),
///     );
/// }
/// let ranking = rank_bids(vec![Bid::new("b", 0.5), Bid::new("a", 0.9)], &descriptors);
/// assert_eq!(ranking[0].agent_id().as_str(), "a");
/// ```
pub fn rank_bids(bids: Vec<Bid>, descriptors: &HashMap<AgentId, AgentDescriptor>) -> Vec<ScoredBid> {
    let mut seen = std::collections::HashSet::new();
    let mut ranking: Vec<ScoredBid> = bids
        .into_iter()
        .filter(|bid| seen.insert(bid.agent_id.clone()))
        .filter_map(|bid| {
            let descriptor = descriptors.get(&bid.agent_id)?;
            let load = descriptor.current_load;
            let success_rate = descriptor.historical_success_rate;
            Some(ScoredBid {
                score: score(bid.confidence, load, success_rate),
                bid,
                load,
                success_rate,
            })
        })
        .collect();

    ranking.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.bid.agent_id.cmp(&b.bid.agent_id))
    });
    ranking
}

/// Result of one negotiation round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegotiationOutcome {
    pub round: u32,
    pub ranking: Vec<ScoredBid>,
    /// Candidates that did not bid before the collection window closed
    pub missing: Vec<AgentId>,
}

impl NegotiationOutcome {
    pub fn winner(&self) -> Option<&AgentId> {
        self.ranking.first().map(ScoredBid::agent_id)
    }
}
