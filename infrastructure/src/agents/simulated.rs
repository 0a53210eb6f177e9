//! Configurable simulated agent
//!
//! Answers `negotiate` with a fixed confidence and `request` after a fixed
//! latency. The first `hang_first` requests are never answered and the next
//! `fail_first` fail with a retryable error, which is enough to drive
//! timeouts, retries, fallback and circuit breaking end to end.

use crate::config::FileAgentConfig;
use async_trait::async_trait;
use conductor_application::{Agent, AgentContext, AgentFailure};
use conductor_domain::{AgentId, AgentMessage, CapabilitySet, Task};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::debug;

pub struct SimulatedAgent {
    id: AgentId,
    capabilities: CapabilitySet,
    confidence: f64,
    estimated_cost: Option<f64>,
    initial_load: f64,
    latency: Duration,
    hang_first: u32,
    fail_first: u32,
    output: Option<Value>,
    requests: AtomicU32,
}

impl SimulatedAgent {
    pub fn new(id: impl Into<AgentId>, capabilities: CapabilitySet) -> Self {
        Self {
            id: id.into(),
            capabilities,
            confidence: 0.5,
            estimated_cost: None,
            initial_load: 0.0,
            latency: Duration::ZERO,
            hang_first: 0,
            fail_first: 0,
            output: None,
            requests: AtomicU32::new(0),
        }
    }

    pub fn from_config(config: &FileAgentConfig) -> Self {
        let mut agent = Self::new(config.id.as_str(), config.capability_set())
            .with_confidence(config.confidence)
            .with_initial_load(config.initial_load)
            .with_latency(Duration::from_millis(config.latency_ms))
            .with_hang_first(config.hang_first)
            .with_fail_first(config.fail_first);
        agent.estimated_cost = config.estimated_cost;
        agent.output = config.output.clone();
        agent
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_estimated_cost(mut self, cost: f64) -> Self {
        self.estimated_cost = Some(cost);
        self
    }

    pub fn with_initial_load(mut self, load: f64) -> Self {
        self.initial_load = load;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_hang_first(mut self, count: u32) -> Self {
        self.hang_first = count;
        self
    }

    pub fn with_fail_first(mut self, count: u32) -> Self {
        self.fail_first = count;
        self
    }

    pub fn with_output(mut self, output: Value) -> Self {
        self.output = Some(output);
        self
    }

    /// Stand-ins for the search, browser and voice agents, used when no
    /// `[[agents]]` are configured.
    pub fn demo_set() -> Vec<SimulatedAgent> {
        let caps = |tags: &[&str]| tags.iter().copied().collect::<CapabilitySet>();
        vec![
            Self::new(
                "search_agent",
                caps(&["research", "information_gathering", "fact_checking", "web_search"]),
            )
            .with_confidence(0.85)
            .with_estimated_cost(5.0)
            .with_latency(Duration::from_millis(300)),
            Self::new(
                "browser_agent",
                caps(&[
                    "web_automation",
                    "browser_interaction",
                    "form_filling",
                    "navigation",
                    "scraping",
                ]),
            )
            .with_confidence(0.7)
            .with_estimated_cost(15.0)
            .with_latency(Duration::from_millis(500)),
            Self::new(
                "voice_agent",
                caps(&[
                    "voice_call",
                    "phone_booking",
                    "booking",
                    "customer_contact",
                    "appointment_scheduling",
                ]),
            )
            .with_confidence(0.75)
            .with_estimated_cost(60.0)
            .with_initial_load(0.2)
            .with_latency(Duration::from_millis(800)),
        ]
    }

    pub fn initial_load(&self) -> f64 {
        self.initial_load
    }

    /// Requests received so far, answered or not.
    pub fn requests_received(&self) -> u32 {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Agent for SimulatedAgent {
    fn id(&self) -> &AgentId {
        &self.id
    }

    fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    fn assess(&self, _task: &Task) -> f64 {
        self.confidence
    }

    fn estimate_cost(&self, _task: &Task) -> Option<f64> {
        self.estimated_cost
    }

    async fn execute(
        &self,
        message: &AgentMessage,
        ctx: &AgentContext,
    ) -> Result<Value, AgentFailure> {
        let n = self.requests.fetch_add(1, Ordering::SeqCst) + 1;
        let query = message
            .content()
            .get("query")
            .and_then(Value::as_str)
            .unwrap_or(ctx.original_request())
            .to_string();

        if n <= self.hang_first {
            debug!(agent_id = %self.id, request = n, "Simulating hang");
            std::future::pending::<()>().await;
        }

        if !self.latency.is_zero() {
            if let Err(e) = ctx.report_status(json!({ "state": "working" })).await {
                debug!(agent_id = %self.id, error = %e, "Status not delivered");
            }
            tokio::time::sleep(self.latency).await;
        }

        if n <= self.hang_first + self.fail_first {
            return Err(AgentFailure::transient(format!(
                "{} simulated failure on request {n}",
                self.id
            ))
            .with_details(json!({ "request": n })));
        }

        let result = self
            .output
            .clone()
            .unwrap_or_else(|| json!({ "summary": format!("{} handled: {}", self.id, query) }));
        Ok(json!({
            "agent_id": self.id,
            "query": query,
            "result": result,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }))
    }
}
