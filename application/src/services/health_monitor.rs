//! Health monitor
//!
//! One [`HealthWindow`] per agent. Every assignment outcome feeds exactly one
//! `record` call; the derived status is returned so the caller can push it
//! into the registry.

use conductor_domain::{AgentId, AgentStatus, HealthReport, HealthThresholds, HealthWindow, Outcome};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::{debug, warn};

pub struct HealthMonitor {
    windows: RwLock<HashMap<AgentId, HealthWindow>>,
    thresholds: HealthThresholds,
}

impl HealthMonitor {
    pub fn new(thresholds: HealthThresholds) -> Self {
        Self {
            windows: RwLock::new(HashMap::new()),
            thresholds,
        }
    }

    pub fn thresholds(&self) -> &HealthThresholds {
        &self.thresholds
    }

    pub async fn record(&self, agent_id: &AgentId, outcome: Outcome) -> AgentStatus {
        let mut windows = self.windows.write().await;
        let window = windows.entry(agent_id.clone()).or_default();
        let before = window.status(&self.thresholds);
        window.record(outcome, &self.thresholds);
        let after = window.status(&self.thresholds);

        if after != before {
            warn!(
                agent_id = %agent_id,
                from = %before,
                to = %after,
                score = window.score(&self.thresholds),
                "Agent health changed"
            );
        } else {
            debug!(agent_id = %agent_id, outcome = ?outcome, status = %after, "Recorded outcome");
        }
        after
    }

    pub async fn report(&self, agent_id: &AgentId) -> Option<HealthReport> {
        self.windows
            .read()
            .await
            .get(agent_id)
            .map(|w| w.report(&self.thresholds))
    }

    /// Reports for every agent with recorded outcomes, sorted by id.
    pub async fn reports(&self) -> BTreeMap<AgentId, HealthReport> {
        self.windows
            .read()
            .await
            .iter()
            .map(|(id, w)| (id.clone(), w.report(&self.thresholds)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_status_degrades_with_failures() {
        let monitor = HealthMonitor::new(HealthThresholds {
            max_consecutive_failures: 3,
            ..Default::default()
        });
        let agent = AgentId::new("a");

        assert_eq!(monitor.record(&agent, Outcome::Success).await, AgentStatus::Available);
        // 1 - 0.6 * 1/2 = 0.7
        assert_eq!(monitor.record(&agent, Outcome::Error).await, AgentStatus::Degraded);
        assert_eq!(monitor.record(&agent, Outcome::Timeout).await, AgentStatus::Degraded);
        assert_eq!(monitor.record(&agent, Outcome::Timeout).await, AgentStatus::Offline);

        let report = monitor.report(&agent).await.unwrap();
        assert_eq!(report.errors, 1);
        assert_eq!(report.timeouts, 2);
        assert_eq!(report.consecutive_failures, 3);
    }

    #[tokio::test]
    async fn test_unknown_agent_has_no_report() {
        let monitor = HealthMonitor::new(HealthThresholds::default());
        assert!(monitor.report(&AgentId::new("ghost")).await.is_none());
        assert!(monitor.reports().await.is_empty());
    }
}
