//! Domain error types
//!
//! [`OrchestrationError`] is the closed taxonomy of ways an orchestration (or a
//! single assignment within it) can fail. Every variant is recorded in the
//! state's error list and a terminal failure always carries one as its reason.

use crate::core::ids::AgentId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Orchestration-level errors
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrchestrationError {
    #[error("No registered agent can handle capability '{hint}'")]
    NoCapableAgent { hint: String },

    #[error("Negotiation failed: no bids from {candidates} candidate(s)")]
    NegotiationFailed { candidates: usize },

    #[error("Agent {agent_id} timed out after {timeout_ms}ms")]
    AgentTimeout { agent_id: AgentId, timeout_ms: u64 },

    #[error("Agent {agent_id} reported an error: {message}")]
    AgentError {
        agent_id: AgentId,
        message: String,
        retryable: bool,
        #[serde(default)]
        details: Value,
    },

    #[error("Agent {agent_id} violated the message protocol: {reason}")]
    AgentProtocolViolation { agent_id: AgentId, reason: String },

    #[error("Circuit open for agent {agent_id}")]
    CircuitOpen { agent_id: AgentId },

    #[error("Retry budget exhausted after {attempts} attempt(s)")]
    MaxRetriesExceeded { attempts: u32 },

    #[error("Orchestration timed out after {timeout_ms}ms")]
    OrchestrationTimeout { timeout_ms: u64 },

    #[error("Orchestration cancelled")]
    Cancelled,

    #[error("Supervisor inbox {address} closed while the orchestration was running")]
    InboxClosed { address: AgentId },
}

impl OrchestrationError {
    /// Stable snake_case name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoCapableAgent { .. } => "no_capable_agent",
            Self::NegotiationFailed { .. } => "negotiation_failed",
            Self::AgentTimeout { .. } => "agent_timeout",
            Self::AgentError { .. } => "agent_error",
            Self::AgentProtocolViolation { .. } => "agent_protocol_violation",
            Self::CircuitOpen { .. } => "circuit_open",
            Self::MaxRetriesExceeded { .. } => "max_retries_exceeded",
            Self::OrchestrationTimeout { .. } => "orchestration_timeout",
            Self::Cancelled => "cancelled",
            Self::InboxClosed { .. } => "inbox_closed",
        }
    }

    /// Whether retrying the same agent may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::AgentTimeout { .. } => true,
            Self::AgentError { retryable, .. } => *retryable,
            _ => false,
        }
    }

    /// Whether the failure is attributable to the assigned agent and should
    /// count against its circuit.
    pub fn is_agent_fault(&self) -> bool {
        matches!(
            self,
            Self::AgentTimeout { .. } | Self::AgentError { .. } | Self::AgentProtocolViolation { .. }
        )
    }

    /// Failures that end the orchestration regardless of remaining candidates.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::OrchestrationTimeout { .. } | Self::Cancelled | Self::InboxClosed { .. }
        )
    }

    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn agent_id(&self) -> Option<&AgentId> {
        match self {
            Self::AgentTimeout { agent_id, .. }
            | Self::AgentError { agent_id, .. }
            | Self::AgentProtocolViolation { agent_id, .. }
            | Self::CircuitOpen { agent_id } => Some(agent_id),
            _ => None,
        }
    }
}

/// Errors raised while decoding or validating a wire message.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MessageError {
    #[error("Unknown message type: {0}")]
    UnknownType(String),

    #[error("Malformed message: {0}")]
    Malformed(String),

    #[error("Invalid bid: {0}")]
    InvalidBid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_error_display() {
        let error = OrchestrationError::Cancelled;
        assert_eq!(error.to_string(), "Orchestration cancelled");
        assert!(error.is_cancelled());
        assert!(error.is_fatal());
    }

    #[test]
    fn test_retryable_classification() {
        let timeout = OrchestrationError::AgentTimeout {
            agent_id: AgentId::new("a"),
            timeout_ms: 100,
        };
        assert!(timeout.is_retryable());
        assert!(timeout.is_agent_fault());

        let transient = OrchestrationError::AgentError {
            agent_id: AgentId::new("a"),
            message: "rate limited".to_string(),
            retryable: true,
            details: Value::Null,
        };
        assert!(transient.is_retryable());

        let permanent = OrchestrationError::AgentError {
            agent_id: AgentId::new("a"),
            message: "bad input".to_string(),
            retryable: false,
            details: Value::Null,
        };
        assert!(!permanent.is_retryable());

        let violation = OrchestrationError::AgentProtocolViolation {
            agent_id: AgentId::new("a"),
            reason: "wrong correlation".to_string(),
        };
        assert!(!violation.is_retryable());
        assert!(violation.is_agent_fault());

        assert!(!OrchestrationError::NoCapableAgent { hint: "x".into() }.is_retryable());
        assert!(!OrchestrationError::CircuitOpen { agent_id: AgentId::new("a") }.is_agent_fault());
    }

    #[test]
    fn test_kind_matches_serialized_tag() {
        let error = OrchestrationError::NegotiationFailed { candidates: 2 };
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["kind"], error.kind());
        assert_eq!(json["candidates"], 2);
    }

    #[test]
    fn test_agent_id_accessor() {
        let error = OrchestrationError::CircuitOpen { agent_id: AgentId::new("b") };
        assert_eq!(error.agent_id(), Some(&AgentId::new("b")));
        assert_eq!(OrchestrationError::Cancelled.agent_id(), None);
    }

    #[test]
    fn test_inbox_closed_is_fatal_but_not_cancelled() {
        let error = OrchestrationError::InboxClosed {
            address: AgentId::new("supervisor/t1/0"),
        };
        assert!(error.is_fatal());
        assert!(!error.is_cancelled());
        assert_eq!(error.kind(), "inbox_closed");
    }
}
