//! Message entities and wire format

use crate::core::error::MessageError;
use crate::core::ids::{AgentId, CorrelationId, MessageId};
use crate::util::current_timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Kind of an [`AgentMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// Work assignment from the supervisor
    Request,
    /// Successful result of a request
    Response,
    /// Failed result of a request (or a protocol violation)
    Error,
    /// Informational progress update; never resolves a correlation
    Status,
    /// Call for bids
    Negotiate,
    /// Reply to a negotiate message
    Bid,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Request => "request",
            MessageType::Response => "response",
            MessageType::Error => "error",
            MessageType::Status => "status",
            MessageType::Negotiate => "negotiate",
            MessageType::Bid => "bid",
        }
    }

    /// Message types the supervisor sends and expects a reply to.
    pub fn expects_reply(&self) -> bool {
        matches!(self, MessageType::Request | MessageType::Negotiate)
    }

    /// Message types that close a pending correlation.
    pub fn resolves_correlation(&self) -> bool {
        matches!(self, MessageType::Response | MessageType::Error | MessageType::Bid)
    }

    /// Whether `self` is an acceptable reply to a message of type `request`.
    ///
    /// A negotiate may be answered with a bid or declined with an error.
    pub fn answers(&self, request: MessageType) -> bool {
        match request {
            MessageType::Request => matches!(self, MessageType::Response | MessageType::Error),
            MessageType::Negotiate => matches!(self, MessageType::Bid | MessageType::Error),
            _ => false,
        }
    }
}

impl FromStr for MessageType {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "request" => Ok(MessageType::Request),
            "response" => Ok(MessageType::Response),
            "error" => Ok(MessageType::Error),
            "status" => Ok(MessageType::Status),
            "negotiate" => Ok(MessageType::Negotiate),
            "bid" => Ok(MessageType::Bid),
            other => Err(MessageError::UnknownType(other.to_string())),
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable message between two bus endpoints.
///
/// Wire form:
///
/// ```json
/// {"id": "...", "from": "supervisor/t1", "to": "search_agent", "type": "request",
///  "content": {...}, "correlation_id": "...", "timestamp": 1700000000000}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessage {
    id: MessageId,
    from: AgentId,
    to: AgentId,
    #[serde(rename = "type")]
    message_type: MessageType,
    content: Value,
    correlation_id: CorrelationId,
    timestamp: u64,
}

impl AgentMessage {
    fn build(
        from: AgentId,
        to: AgentId,
        message_type: MessageType,
        content: Value,
        correlation_id: CorrelationId,
    ) -> Self {
        Self {
            id: MessageId::generate(),
            from,
            to,
            message_type,
            content,
            correlation_id,
            timestamp: current_timestamp(),
        }
    }

    /// A work request opening a new correlation.
    pub fn request(from: AgentId, to: AgentId, content: Value) -> Self {
        Self::build(from, to, MessageType::Request, content, CorrelationId::generate())
    }

    /// A call for bids opening a new correlation.
    pub fn negotiate(from: AgentId, to: AgentId, content: Value) -> Self {
        Self::build(from, to, MessageType::Negotiate, content, CorrelationId::generate())
    }

    /// A status message attached to an existing correlation.
    pub fn status(from: AgentId, to: AgentId, correlation_id: CorrelationId, content: Value) -> Self {
        Self::build(from, to, MessageType::Status, content, correlation_id)
    }

    /// Builds a reply travelling back to the sender of `self`, reusing its
    /// correlation id.
    pub fn reply(&self, message_type: MessageType, content: Value) -> Self {
        Self::build(
            self.to.clone(),
            self.from.clone(),
            message_type,
            content,
            self.correlation_id,
        )
    }

    /// Decodes and validates the wire form.
    ///
    /// Unknown `type` values are rejected with [`MessageError::UnknownType`];
    /// any other structural problem yields [`MessageError::Malformed`].
    pub fn from_json(raw: &str) -> Result<Self, MessageError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| MessageError::Malformed(e.to_string()))?;
        let message_type = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| MessageError::Malformed("missing 'type'".to_string()))?;
        MessageType::from_str(message_type)?;
        serde_json::from_value(value).map_err(|e| MessageError::Malformed(e.to_string()))
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn from(&self) -> &AgentId {
        &self.from
    }

    pub fn to(&self) -> &AgentId {
        &self.to
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn content(&self) -> &Value {
        &self.content
    }

    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Whether `self` is a well-formed reply to `request`: right type, same
    /// correlation, and addressed back to the requester by the requestee.
    pub fn is_reply_to(&self, request: &AgentMessage) -> bool {
        self.correlation_id == request.correlation_id
            && self.from == request.to
            && self.to == request.from
            && self.message_type.answers(request.message_type)
    }
}

impl std::fmt::Display for AgentMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} -> {} [{}]",
            self.message_type, self.from, self.to, self.correlation_id
        )
    }
}
