//! Bus adapter for agents
//!
//! [`AgentEndpoint`] subscribes an [`Agent`] under its id. Each inbound
//! negotiate/request is served on its own task so one slow execution does not
//! stall the endpoint's queue. Whatever the agent does, exactly one reply
//! goes back unless the execution was cancelled: faults, malformed replies
//! and panics become an `error` message flagged `protocol_violation`.
//!
//! At most one request per supervisor inbox executes at a time. A cancel
//! notice for the running request, or a newer request from the same inbox,
//! aborts it.

use crate::ports::agent::{Agent, AgentContext, AgentFault};
use crate::services::message_bus::{MessageBus, MessageHandler};
use async_trait::async_trait;
use conductor_domain::{AgentId, AgentMessage, CorrelationId, MessageType, TaskId};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::{AbortHandle, JoinError};
use tracing::{debug, warn};

/// Request currently executing for one supervisor inbox.
struct InFlight {
    correlation_id: CorrelationId,
    worker: AbortHandle,
}

type InFlightMap = Arc<Mutex<HashMap<AgentId, InFlight>>>;

pub struct AgentEndpoint {
    agent: Arc<dyn Agent>,
    bus: MessageBus,
    in_flight: InFlightMap,
}

impl AgentEndpoint {
    pub fn new(agent: Arc<dyn Agent>, bus: MessageBus) -> Self {
        Self {
            agent,
            bus,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Subscribes `agent` on `bus` under its own id.
    pub async fn attach(agent: Arc<dyn Agent>, bus: &MessageBus) {
        let agent_id = agent.id().clone();
        let endpoint = Arc::new(Self::new(agent, bus.clone()));
        bus.subscribe(agent_id, endpoint).await;
    }

    /// Number of requests currently executing.
    pub async fn in_flight(&self) -> usize {
        self.in_flight.lock().await.len()
    }

    async fn serve(&self, request: AgentMessage) {
        let ctx = match AgentContext::from_message(&request, self.bus.clone()) {
            Ok(ctx) => ctx,
            Err(e) => {
                let reply = request.reply(
                    MessageType::Error,
                    json!({"error": e.to_string(), "retryable": false}),
                );
                deliver(&self.bus, reply).await;
                return;
            }
        };
        let task_id = ctx.task_id().clone();
        let inbox = request.from().clone();

        let worker = {
            let agent = Arc::clone(&self.agent);
            let request = request.clone();
            tokio::spawn(async move { agent.handle(&request, &ctx).await })
        };

        let tracked = request.message_type() == MessageType::Request;
        if tracked {
            let entry = InFlight {
                correlation_id: request.correlation_id(),
                worker: worker.abort_handle(),
            };
            if let Some(stale) = self.in_flight.lock().await.insert(inbox.clone(), entry) {
                stale.worker.abort();
                warn!(
                    agent_id = %self.agent.id(),
                    task_id = %task_id,
                    correlation_id = %stale.correlation_id,
                    "Superseded execution aborted"
                );
            }
        }

        let in_flight = Arc::clone(&self.in_flight);
        let bus = self.bus.clone();
        tokio::spawn(async move {
            let outcome = worker.await;
            if tracked {
                release(&in_flight, &inbox, request.correlation_id()).await;
            }
            match outcome {
                Err(e) if e.is_cancelled() => {
                    debug!(correlation_id = %request.correlation_id(), "Execution aborted, no reply");
                }
                outcome => deliver(&bus, validate(&request, outcome)).await,
            }
        });
    }

    async fn cancel(&self, notice: &AgentMessage) {
        let task_id = cancelled_task(notice);
        {
            let mut in_flight = self.in_flight.lock().await;
            if in_flight
                .get(notice.from())
                .is_some_and(|entry| entry.correlation_id == notice.correlation_id())
                && let Some(entry) = in_flight.remove(notice.from())
            {
                entry.worker.abort();
                debug!(agent_id = %self.agent.id(), task_id = %task_id, "Execution aborted on cancel");
            }
        }

        let agent = Arc::clone(&self.agent);
        debug!(agent_id = %agent.id(), task_id = %task_id, "Forwarding cancellation");
        tokio::spawn(async move { agent.on_cancel(&task_id).await });
    }
}

#[async_trait]
impl MessageHandler for AgentEndpoint {
    async fn on_message(&self, message: AgentMessage) {
        match message.message_type() {
            MessageType::Request | MessageType::Negotiate => self.serve(message).await,
            MessageType::Status if is_cancel(message.content()) => self.cancel(&message).await,
            other => {
                debug!(agent_id = %self.agent.id(), message_type = %other, "Ignoring message");
            }
        }
    }
}

/// Drops the entry for `inbox` if it still belongs to `correlation_id`.
async fn release(in_flight: &InFlightMap, inbox: &AgentId, correlation_id: CorrelationId) {
    let mut in_flight = in_flight.lock().await;
    if in_flight
        .get(inbox)
        .is_some_and(|entry| entry.correlation_id == correlation_id)
    {
        in_flight.remove(inbox);
    }
}

async fn deliver(bus: &MessageBus, reply: AgentMessage) {
    if let Err(e) = bus.publish(reply).await {
        warn!(error = %e, "Failed to deliver agent reply");
    }
}

fn is_cancel(content: &Value) -> bool {
    content.get("cancel").and_then(Value::as_bool) == Some(true)
}

fn cancelled_task(message: &AgentMessage) -> TaskId {
    message
        .content()
        .get("task_id")
        .and_then(Value::as_str)
        .map(TaskId::new)
        .or_else(|| message.from().supervised_task())
        .unwrap_or_else(|| TaskId::new(message.from().as_str()))
}

/// Checks a finished execution and turns it into the reply to send.
fn validate(
    request: &AgentMessage,
    outcome: Result<Result<AgentMessage, AgentFault>, JoinError>,
) -> AgentMessage {
    match outcome {
        Ok(Ok(reply)) if reply.is_reply_to(request) => reply,
        Ok(Ok(reply)) => protocol_violation(
            request,
            format!(
                "reply '{}' with correlation {} does not answer {} {}",
                reply.message_type(),
                reply.correlation_id(),
                request.message_type(),
                request.correlation_id()
            ),
        ),
        Ok(Err(fault)) => protocol_violation(request, fault.to_string()),
        Err(e) if e.is_panic() => protocol_violation(request, "agent panicked".to_string()),
        Err(e) => protocol_violation(request, format!("agent task aborted: {e}")),
    }
}

/// Error reply marking a protocol violation by the agent.
pub fn protocol_violation(request: &AgentMessage, reason: String) -> AgentMessage {
    warn!(agent_id = %request.to(), correlation_id = %request.correlation_id(), reason = %reason, "Agent protocol violation");
    request.reply(
        MessageType::Error,
        json!({
            "error": reason,
            "retryable": false,
            "protocol_violation": true,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::agent::{AgentFailure, AgentFault};
    use conductor_domain::{AgentId, CapabilitySet, Task};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    #[derive(Clone, Copy)]
    enum Mode {
        Ok,
        Panic,
        WrongCorrelation,
        Fault,
        Hang,
    }

    struct Scripted {
        id: AgentId,
        capabilities: CapabilitySet,
        mode: Mode,
        cancels: Arc<AtomicUsize>,
        stopped: Arc<AtomicUsize>,
    }

    /// Counts executions that were dropped before finishing.
    struct StopGuard(Arc<AtomicUsize>);

    impl Drop for StopGuard {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Agent for Scripted {
        fn id(&self) -> &AgentId {
            &self.id
        }
        fn capabilities(&self) -> &CapabilitySet {
            &self.capabilities
        }
        fn assess(&self, _task: &Task) -> f64 {
            0.5
        }
        async fn execute(
            &self,
            _message: &AgentMessage,
            ctx: &AgentContext,
        ) -> Result<Value, AgentFailure> {
            let _ = ctx.report_status(json!({"progress": 0.5})).await;
            Ok(json!({"done": true}))
        }
        async fn handle(
            &self,
            message: &AgentMessage,
            ctx: &AgentContext,
        ) -> Result<AgentMessage, AgentFault> {
            match self.mode {
                Mode::Ok => {
                    let output = self.execute(message, ctx).await.unwrap_or(Value::Null);
                    Ok(message.reply(MessageType::Response, output))
                }
                Mode::Panic => panic!("boom"),
                Mode::WrongCorrelation => Ok(AgentMessage::request(
                    self.id.clone(),
                    message.from().clone(),
                    json!({}),
                )),
                Mode::Fault => Err(AgentFault::Crashed("lost connection".to_string())),
                Mode::Hang => {
                    let _guard = StopGuard(Arc::clone(&self.stopped));
                    tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                    Ok(message.reply(MessageType::Response, json!("too late")))
                }
            }
        }
        async fn on_cancel(&self, _task_id: &TaskId) {
            self.cancels.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Collect(mpsc::UnboundedSender<AgentMessage>);

    #[async_trait]
    impl MessageHandler for Collect {
        async fn on_message(&self, message: AgentMessage) {
            let _ = self.0.send(message);
        }
    }

    struct Harness {
        bus: MessageBus,
        rx: mpsc::UnboundedReceiver<AgentMessage>,
        endpoint: Arc<AgentEndpoint>,
        cancels: Arc<AtomicUsize>,
        stopped: Arc<AtomicUsize>,
    }

    async fn harness(mode: Mode) -> Harness {
        let bus = MessageBus::new();
        let cancels = Arc::new(AtomicUsize::new(0));
        let stopped = Arc::new(AtomicUsize::new(0));
        let agent = Arc::new(Scripted {
            id: AgentId::new("worker"),
            capabilities: CapabilitySet::new().with("research"),
            mode,
            cancels: Arc::clone(&cancels),
            stopped: Arc::clone(&stopped),
        });
        let endpoint = Arc::new(AgentEndpoint::new(agent, bus.clone()));
        bus.subscribe(AgentId::new("worker"), endpoint.clone()).await;
        let (tx, rx) = mpsc::unbounded_channel();
        bus.subscribe(AgentId::new("supervisor/t1"), Arc::new(Collect(tx))).await;
        Harness {
            bus,
            rx,
            endpoint,
            cancels,
            stopped,
        }
    }

    async fn setup(mode: Mode) -> (MessageBus, mpsc::UnboundedReceiver<AgentMessage>, Arc<AtomicUsize>) {
        let h = harness(mode).await;
        (h.bus, h.rx, h.cancels)
    }

    fn cancel_notice(request: &AgentMessage) -> AgentMessage {
        AgentMessage::status(
            request.from().clone(),
            request.to().clone(),
            request.correlation_id(),
            json!({"cancel": true, "task_id": "t1"}),
        )
    }

    fn request() -> AgentMessage {
        AgentMessage::request(
            AgentId::new("supervisor/t1"),
            AgentId::new("worker"),
            json!({"task": Task::new("t1", "look it up")}),
        )
    }

    #[tokio::test]
    async fn test_status_then_response() {
        let (bus, mut rx, _) = setup(Mode::Ok).await;
        let req = request();
        bus.publish(req.clone()).await.unwrap();

        let status = rx.recv().await.unwrap();
        assert_eq!(status.message_type(), MessageType::Status);
        assert_eq!(status.correlation_id(), req.correlation_id());

        let reply = rx.recv().await.unwrap();
        assert_eq!(reply.message_type(), MessageType::Response);
        assert!(reply.is_reply_to(&req));
    }

    #[tokio::test]
    async fn test_panic_becomes_protocol_violation() {
        let (bus, mut rx, _) = setup(Mode::Panic).await;
        let req = request();
        bus.publish(req.clone()).await.unwrap();

        let reply = rx.recv().await.unwrap();
        assert_eq!(reply.message_type(), MessageType::Error);
        assert_eq!(reply.correlation_id(), req.correlation_id());
        assert_eq!(reply.content()["protocol_violation"], true);
    }

    #[tokio::test]
    async fn test_wrong_correlation_becomes_protocol_violation() {
        let (bus, mut rx, _) = setup(Mode::WrongCorrelation).await;
        let req = request();
        bus.publish(req.clone()).await.unwrap();

        let reply = rx.recv().await.unwrap();
        assert!(reply.is_reply_to(&req));
        assert_eq!(reply.content()["protocol_violation"], true);
    }

    #[tokio::test]
    async fn test_fault_becomes_protocol_violation() {
        let (bus, mut rx, _) = setup(Mode::Fault).await;
        bus.publish(request()).await.unwrap();

        let reply = rx.recv().await.unwrap();
        assert_eq!(reply.content()["protocol_violation"], true);
        assert!(reply.content()["error"].as_str().unwrap().contains("lost connection"));
    }

    #[tokio::test]
    async fn test_request_without_task_is_rejected() {
        let (bus, mut rx, _) = setup(Mode::Ok).await;
        let req = AgentMessage::request(
            AgentId::new("supervisor/t1"),
            AgentId::new("worker"),
            json!({"query": "no task"}),
        );
        bus.publish(req.clone()).await.unwrap();

        let reply = rx.recv().await.unwrap();
        assert_eq!(reply.message_type(), MessageType::Error);
        assert_eq!(reply.content()["retryable"], false);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_status_reaches_agent() {
        let (bus, _rx, cancels) = setup(Mode::Ok).await;
        bus.publish(cancel_notice(&request())).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(cancels.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_running_execution_without_reply() {
        let mut h = harness(Mode::Hang).await;
        let req = request();
        h.bus.publish(req.clone()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(h.endpoint.in_flight().await, 1);

        h.bus.publish(cancel_notice(&req)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        assert_eq!(h.stopped.load(Ordering::SeqCst), 1);
        assert_eq!(h.cancels.load(Ordering::SeqCst), 1);
        assert_eq!(h.endpoint.in_flight().await, 0);
        assert!(h.rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_request_from_same_inbox_supersedes_running_one() {
        let mut h = harness(Mode::Hang).await;
        let first = request();
        h.bus.publish(first.clone()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        let second = request();
        h.bus.publish(second.clone()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        assert_eq!(h.stopped.load(Ordering::SeqCst), 1);
        assert_eq!(h.endpoint.in_flight().await, 1);
        assert!(h.rx.try_recv().is_err());

        // A late cancel for the first request leaves the second running.
        h.bus.publish(cancel_notice(&first)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(h.stopped.load(Ordering::SeqCst), 1);
        assert_eq!(h.endpoint.in_flight().await, 1);

        h.bus.publish(cancel_notice(&second)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(h.stopped.load(Ordering::SeqCst), 2);
        assert_eq!(h.endpoint.in_flight().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_sharing_a_task_id_do_not_supersede_each_other() {
        let h = harness(Mode::Hang).await;
        let other_run = AgentMessage::request(
            AgentId::new("supervisor/t1/second"),
            AgentId::new("worker"),
            json!({"task": Task::new("t1", "look it up")}),
        );
        h.bus.publish(request()).await.unwrap();
        h.bus.publish(other_run).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        assert_eq!(h.endpoint.in_flight().await, 2);
        assert_eq!(h.stopped.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_finished_request_leaves_nothing_in_flight() {
        let mut h = harness(Mode::Ok).await;
        h.bus.publish(request()).await.unwrap();

        let _status = h.rx.recv().await.unwrap();
        let reply = h.rx.recv().await.unwrap();
        assert_eq!(reply.message_type(), MessageType::Response);
        tokio::task::yield_now().await;
        assert_eq!(h.endpoint.in_flight().await, 0);
    }
}
