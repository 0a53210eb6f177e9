//! Agent descriptors tracked by the registry

use crate::core::capability::CapabilitySet;
use crate::core::ids::AgentId;
use crate::util::current_timestamp;
use serde::{Deserialize, Serialize};

/// Availability of an agent as seen by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Available,
    Busy,
    Degraded,
    Offline,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Available => "available",
            AgentStatus::Busy => "busy",
            AgentStatus::Degraded => "degraded",
            AgentStatus::Offline => "offline",
        }
    }

    /// Offline agents are never offered work.
    pub fn accepts_work(&self) -> bool {
        !matches!(self, AgentStatus::Offline)
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Registry record for one agent.
///
/// `current_load` and `historical_success_rate` stay within `[0, 1]`; every
/// mutator clamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub agent_id: AgentId,
    pub capabilities: CapabilitySet,
    pub status: AgentStatus,
    pub current_load: f64,
    pub historical_success_rate: f64,
    /// Unix millis of the last heartbeat (or registration)
    pub last_heartbeat: u64,
    /// Assignments started and not yet ended or released
    #[serde(default)]
    pub active_assignments: u32,
    /// Load actually added by the active assignments after clamping
    #[serde(default)]
    pub assigned_load: f64,
}

impl AgentDescriptor {
    pub fn new(agent_id: impl Into<AgentId>, capabilities: CapabilitySet) -> Self {
        Self {
            agent_id: agent_id.into(),
            capabilities,
            status: AgentStatus::Available,
            current_load: 0.0,
            historical_success_rate: 1.0,
            last_heartbeat: current_timestamp(),
            active_assignments: 0,
            assigned_load: 0.0,
        }
    }

    pub fn with_load(mut self, load: f64) -> Self {
        self.current_load = clamp_unit(load);
        self
    }

    pub fn with_success_rate(mut self, rate: f64) -> Self {
        self.historical_success_rate = clamp_unit(rate);
        self
    }

    pub fn with_status(mut self, status: AgentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn can_handle(&self, tag: &str) -> bool {
        self.capabilities.contains(tag)
    }

    pub fn can_handle_any(&self, hint: &CapabilitySet) -> bool {
        self.capabilities.intersects(hint)
    }

    pub fn heartbeat(&mut self, load: f64, status: AgentStatus) {
        self.current_load = clamp_unit(load);
        self.status = status;
        self.last_heartbeat = current_timestamp();
    }

    /// Load bump applied when an assignment starts.
    pub fn begin_assignment(&mut self, load_step: f64) {
        let before = self.current_load;
        self.current_load = clamp_unit(before + load_step);
        self.assigned_load += self.current_load - before;
        self.active_assignments += 1;
    }

    /// Load release without an outcome (assignment abandoned).
    pub fn release_assignment(&mut self) {
        self.unload();
    }

    /// Load release plus exponentially weighted success-rate update.
    pub fn end_assignment(&mut self, success: bool, alpha: f64) {
        self.unload();
        let sample = if success { 1.0 } else { 0.0 };
        let alpha = clamp_unit(alpha);
        self.historical_success_rate =
            clamp_unit((1.0 - alpha) * self.historical_success_rate + alpha * sample);
    }

    /// Gives back one active assignment's share of the load it added, so a
    /// step clipped at 1.0 is not subtracted in full.
    fn unload(&mut self) {
        if self.active_assignments == 0 {
            return;
        }
        let share = self.assigned_load / f64::from(self.active_assignments);
        self.active_assignments -= 1;
        self.assigned_load = if self.active_assignments == 0 {
            0.0
        } else {
            (self.assigned_load - share).max(0.0)
        };
        self.current_load = clamp_unit(self.current_load - share);
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> AgentDescriptor {
        AgentDescriptor::new("search_agent", ["research", "web_search"].into_iter().collect())
    }

    #[test]
    fn test_new_descriptor_defaults() {
        let d = descriptor();
        assert_eq!(d.status, AgentStatus::Available);
        assert_eq!(d.current_load, 0.0);
        assert_eq!(d.historical_success_rate, 1.0);
        assert!(d.can_handle("research"));
        assert!(!d.can_handle("booking"));
    }

    #[test]
    fn test_load_is_clamped() {
        let mut d = descriptor().with_load(0.5);
        for _ in 0..3 {
            d.begin_assignment(0.25);
        }
        assert_eq!(d.current_load, 1.0);
        for _ in 0..5 {
            d.end_assignment(true, 0.2);
        }
        assert!((d.current_load - 0.5).abs() < 1e-9);
        assert_eq!(d.active_assignments, 0);
        assert_eq!(descriptor().with_load(-3.0).current_load, 0.0);
    }

    #[test]
    fn test_clipped_step_returns_to_starting_load() {
        let mut d = descriptor().with_load(0.9);
        d.begin_assignment(0.25);
        assert_eq!(d.current_load, 1.0);
        d.end_assignment(true, 0.2);
        assert!((d.current_load - 0.9).abs() < 1e-9);

        d.begin_assignment(0.25);
        d.begin_assignment(0.25);
        d.release_assignment();
        d.release_assignment();
        assert!((d.current_load - 0.9).abs() < 1e-9);
        assert_eq!(d.assigned_load, 0.0);
    }

    #[test]
    fn test_success_rate_moving_average() {
        let mut d = descriptor();
        d.begin_assignment(0.25);
        d.end_assignment(false, 0.2);
        assert!((d.historical_success_rate - 0.8).abs() < 1e-9);
        d.begin_assignment(0.25);
        d.end_assignment(true, 0.2);
        assert!((d.historical_success_rate - 0.84).abs() < 1e-9);
    }

    #[test]
    fn test_release_keeps_success_rate() {
        let mut d = descriptor();
        d.begin_assignment(0.25);
        d.release_assignment();
        assert_eq!(d.current_load, 0.0);
        assert_eq!(d.historical_success_rate, 1.0);
    }

    #[test]
    fn test_heartbeat_updates_status() {
        let mut d = descriptor();
        d.heartbeat(0.5, AgentStatus::Busy);
        assert_eq!(d.current_load, 0.5);
        assert_eq!(d.status, AgentStatus::Busy);
        assert!(d.status.accepts_work());
        assert!(!AgentStatus::Offline.accepts_work());
    }
}
