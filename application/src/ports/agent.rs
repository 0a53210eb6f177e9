//! Agent port
//!
//! Every concrete agent implements one capability contract, [`Agent`]. Agents
//! are selected by capability tag and bid, never by type inspection; new agent
//! kinds register their tag set at runtime.

use crate::services::message_bus::{BusError, MessageBus};
use async_trait::async_trait;
use conductor_domain::{
    AgentId, AgentMessage, Bid, CapabilitySet, CorrelationId, MessageError, MessageType, Priority,
    Task, TaskId,
};
use serde_json::{Value, json};
use thiserror::Error;

/// A failed execution reported by the agent itself.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentFailure {
    pub message: String,
    /// Whether the same agent may succeed on a retry
    pub retryable: bool,
    pub details: Value,
}

impl AgentFailure {
    /// A failure worth retrying (rate limit, flaky upstream, ...).
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
            details: Value::Null,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
            details: Value::Null,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Content of the `error` message sent back to the supervisor.
    pub fn to_content(&self) -> Value {
        json!({
            "error": self.message,
            "retryable": self.retryable,
            "details": self.details,
        })
    }
}

/// The agent could not produce a well-formed reply at all.
///
/// Always surfaces to the supervisor as a protocol violation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentFault {
    #[error("Malformed reply: {0}")]
    MalformedReply(String),

    #[error("Agent crashed: {0}")]
    Crashed(String),
}

/// Read-only view of the orchestration handed to an agent, plus a way to
/// emit `status` messages for the request being served.
#[derive(Clone)]
pub struct AgentContext {
    task: Task,
    agent_id: AgentId,
    reply_to: AgentId,
    correlation_id: CorrelationId,
    bus: MessageBus,
}

impl AgentContext {
    /// Builds the context from an inbound negotiate/request message, whose
    /// content carries the task under `task`.
    pub fn from_message(message: &AgentMessage, bus: MessageBus) -> Result<Self, MessageError> {
        let task = message
            .content()
            .get("task")
            .cloned()
            .ok_or_else(|| MessageError::Malformed("missing 'task' in content".to_string()))?;
        let task: Task =
            serde_json::from_value(task).map_err(|e| MessageError::Malformed(e.to_string()))?;
        Ok(Self {
            task,
            agent_id: message.to().clone(),
            reply_to: message.from().clone(),
            correlation_id: message.correlation_id(),
            bus,
        })
    }

    /// A context not attached to any live orchestration.
    pub fn detached(agent_id: AgentId, task: Task) -> Self {
        let reply_to = AgentId::supervisor_inbox(&task.task_id);
        Self {
            task,
            agent_id,
            reply_to,
            correlation_id: CorrelationId::generate(),
            bus: MessageBus::new(),
        }
    }

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

    /// Sends an intermediate `status` message. It never resolves the request.
    pub async fn report_status(&self, content: Value) -> Result<(), BusError> {
        self.bus
            .publish(AgentMessage::status(
                self.agent_id.clone(),
                self.reply_to.clone(),
                self.correlation_id,
                content,
            ))
            .await
    }
}

/// The capability contract every agent implements.
#[async_trait]
pub trait Agent: Send + Sync {
    fn id(&self) -> &AgentId;

    fn capabilities(&self) -> &CapabilitySet;

    /// Fitness for `task` in `[0, 1]`. Must be deterministic and free of side
    /// effects so negotiation is reproducible.
    fn assess(&self, task: &Task) -> f64;

    /// Optional cost estimate included in bids.
    fn estimate_cost(&self, _task: &Task) -> Option<f64> {
        None
    }

    /// Performs the work for a `request` message.
    async fn execute(&self, message: &AgentMessage, ctx: &AgentContext)
    -> Result<Value, AgentFailure>;

    /// Produces exactly one terminal reply for `message`.
    ///
    /// `request` → `response` or `error`, `negotiate` → `bid`, anything else
    /// → `error`.
    async fn handle(
        &self,
        message: &AgentMessage,
        ctx: &AgentContext,
    ) -> Result<AgentMessage, AgentFault> {
        let reply = match message.message_type() {
            MessageType::Request => match self.execute(message, ctx).await {
                Ok(output) => message.reply(MessageType::Response, output),
                Err(failure) => message.reply(MessageType::Error, failure.to_content()),
            },
            MessageType::Negotiate => {
                let confidence = self.assess(ctx.task());
                message.reply(
                    MessageType::Bid,
                    Bid::content(confidence, self.estimate_cost(ctx.task())),
                )
            }
            other => message.reply(
                MessageType::Error,
                json!({
                    "error": format!("Unsupported message type: {other}"),
                    "retryable": false,
                }),
            ),
        };
        Ok(reply)
    }

    /// Best-effort notification that the task was cancelled.
    async fn on_cancel(&self, _task_id: &TaskId) {}
}
