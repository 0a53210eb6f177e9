//! Shared utilities for use cases.
//!
//! Contains the per-orchestration supervisor inbox: the only place an
//! orchestration suspends, racing inbound messages against the step deadline,
//! the orchestration deadline and cancellation.

use crate::services::message_bus::{MessageBus, MessageHandler};
use async_trait::async_trait;
use conductor_domain::{AgentId, AgentMessage, OrchestrationError, TaskId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

/// What ended a wait on the inbox.
#[derive(Debug)]
pub(crate) enum WaitEvent {
    Message(AgentMessage),
    /// The caller's step deadline (bid window, assignment timeout, backoff)
    StepTimeout,
    OrchestrationTimeout,
    Cancelled,
    /// The bus dropped this inbox's subscription
    Closed,
}

struct InboxHandler {
    sender: mpsc::UnboundedSender<AgentMessage>,
}

#[async_trait]
impl MessageHandler for InboxHandler {
    async fn on_message(&self, message: AgentMessage) {
        let _ = self.sender.send(message);
    }
}

/// Bus endpoint `supervisor/<task_id>/<instance>` owned by one orchestration.
pub(crate) struct Inbox {
    address: AgentId,
    receiver: mpsc::UnboundedReceiver<AgentMessage>,
    deadline: Instant,
    budget: Duration,
    cancel: CancellationToken,
}

impl Inbox {
    pub(crate) async fn open(
        bus: &MessageBus,
        task_id: &TaskId,
        budget: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let address = AgentId::supervisor_instance(task_id);
        bus.subscribe(address.clone(), Arc::new(InboxHandler { sender }))
            .await;
        Self {
            address,
            receiver,
            deadline: Instant::now() + budget,
            budget,
            cancel,
        }
    }

    pub(crate) async fn close(&self, bus: &MessageBus) {
        bus.unsubscribe(&self.address).await;
    }

    pub(crate) fn address(&self) -> &AgentId {
        &self.address
    }

    pub(crate) fn closed_error(&self) -> OrchestrationError {
        OrchestrationError::InboxClosed {
            address: self.address.clone(),
        }
    }

    pub(crate) fn timeout_error(&self) -> OrchestrationError {
        OrchestrationError::OrchestrationTimeout {
            timeout_ms: u64::try_from(self.budget.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Non-blocking check for cancellation or an expired orchestration deadline.
    pub(crate) fn interrupted(&self) -> Option<OrchestrationError> {
        if self.cancel.is_cancelled() {
            Some(OrchestrationError::Cancelled)
        } else if Instant::now() >= self.deadline {
            Some(self.timeout_error())
        } else {
            None
        }
    }

    /// Waits for the next inbound message or the first deadline to pass.
    ///
    /// Cancellation wins over the orchestration deadline, which wins over the
    /// step deadline.
    pub(crate) async fn next(&mut self, step_deadline: Instant) -> WaitEvent {
        let step = step_deadline.min(self.deadline);
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => WaitEvent::Cancelled,
            _ = sleep_until(self.deadline) => WaitEvent::OrchestrationTimeout,
            _ = sleep_until(step) => WaitEvent::StepTimeout,
            message = self.receiver.recv() => match message {
                Some(message) => WaitEvent::Message(message),
                None => WaitEvent::Closed,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn inbox(budget: Duration) -> (MessageBus, Inbox, CancellationToken) {
        let bus = MessageBus::new();
        let cancel = CancellationToken::new();
        let inbox = Inbox::open(&bus, &TaskId::new("t1"), budget, cancel.clone()).await;
        (bus, inbox, cancel)
    }

    #[tokio::test(start_paused = true)]
    async fn test_receives_messages_for_its_address() {
        let (bus, mut inbox, _) = inbox(Duration::from_secs(10)).await;
        assert!(inbox.address().as_str().starts_with("supervisor/t1/"));
        assert_eq!(inbox.address().supervised_task(), Some(TaskId::new("t1")));

        let message = AgentMessage::request(AgentId::new("a"), inbox.address().clone(), json!({}));
        bus.publish(message.clone()).await.unwrap();

        match inbox.next(Instant::now() + Duration::from_secs(1)).await {
            WaitEvent::Message(received) => assert_eq!(received, message),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_timeout_before_orchestration_timeout() {
        let (_bus, mut inbox, _) = inbox(Duration::from_secs(10)).await;
        let event = inbox.next(Instant::now() + Duration::from_secs(1)).await;
        assert!(matches!(event, WaitEvent::StepTimeout));
    }

    #[tokio::test(start_paused = true)]
    async fn test_orchestration_deadline_caps_step() {
        let (_bus, mut inbox, _) = inbox(Duration::from_secs(1)).await;
        let event = inbox.next(Instant::now() + Duration::from_secs(60)).await;
        assert!(matches!(event, WaitEvent::OrchestrationTimeout));
        assert!(matches!(
            inbox.interrupted(),
            Some(OrchestrationError::OrchestrationTimeout { timeout_ms: 1000 })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_wins() {
        let (_bus, mut inbox, cancel) = inbox(Duration::from_secs(10)).await;
        cancel.cancel();
        let event = inbox.next(Instant::now() + Duration::from_secs(1)).await;
        assert!(matches!(event, WaitEvent::Cancelled));
        assert_eq!(inbox.interrupted(), Some(OrchestrationError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_task_id_gets_separate_inboxes() {
        let bus = MessageBus::new();
        let task = TaskId::new("dup");
        let mut first = Inbox::open(&bus, &task, Duration::from_secs(10), CancellationToken::new()).await;
        let mut second = Inbox::open(&bus, &task, Duration::from_secs(10), CancellationToken::new()).await;
        assert_ne!(first.address(), second.address());

        let to_first = AgentMessage::request(AgentId::new("a"), first.address().clone(), json!({"n": 1}));
        let to_second = AgentMessage::request(AgentId::new("a"), second.address().clone(), json!({"n": 2}));
        bus.publish(to_second.clone()).await.unwrap();
        bus.publish(to_first.clone()).await.unwrap();

        let step = Instant::now() + Duration::from_secs(1);
        assert!(matches!(first.next(step).await, WaitEvent::Message(m) if m == to_first));
        assert!(matches!(second.next(step).await, WaitEvent::Message(m) if m == to_second));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_subscription_is_not_reported_as_cancellation() {
        let (bus, mut inbox, _) = inbox(Duration::from_secs(10)).await;
        inbox.close(&bus).await;

        let event = inbox.next(Instant::now() + Duration::from_secs(1)).await;
        assert!(matches!(event, WaitEvent::Closed));
        assert!(matches!(
            inbox.closed_error(),
            OrchestrationError::InboxClosed { address } if &address == inbox.address()
        ));
    }
}
