//! Engine tuning sections: `[negotiation]`, `[execution]`, `[retry]`,
//! `[circuit]` and `[health]`.
//!
//! Durations are plain milliseconds in TOML (`assignment_timeout_ms = 30000`).

use conductor_application::{ExecutionParams, NegotiationParams};
use conductor_domain::{
    CircuitConfig, ConfigIssue, ConfigIssueCode, HealthThresholds, RetryPolicy,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn zero_duration(field: &str) -> ConfigIssue {
    ConfigIssue::error(
        ConfigIssueCode::ZeroDuration,
        format!("{field} must be greater than 0"),
    )
}

fn check_unit(field: &str, value: f64, issues: &mut Vec<ConfigIssue>) {
    if !(0.0..=1.0).contains(&value) {
        issues.push(ConfigIssue::error(
            ConfigIssueCode::OutOfRange,
            format!("{field} must be within [0, 1], got {value}"),
        ));
    }
}

/// Raw `[negotiation]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileNegotiationConfig {
    pub bid_timeout_ms: u64,
}

impl Default for FileNegotiationConfig {
    fn default() -> Self {
        Self {
            bid_timeout_ms: millis(NegotiationParams::default().bid_timeout),
        }
    }
}

impl FileNegotiationConfig {
    pub fn to_params(&self) -> NegotiationParams {
        NegotiationParams {
            bid_timeout: Duration::from_millis(self.bid_timeout_ms),
        }
    }

    pub(super) fn validate(&self, issues: &mut Vec<ConfigIssue>) {
        if self.bid_timeout_ms == 0 {
            issues.push(zero_duration("negotiation.bid_timeout_ms"));
        }
    }
}

/// Raw `[execution]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileExecutionConfig {
    pub assignment_timeout_ms: u64,
    pub orchestration_timeout_ms: u64,
    pub load_step: f64,
    pub success_rate_alpha: f64,
}

impl Default for FileExecutionConfig {
    fn default() -> Self {
        let params = ExecutionParams::default();
        Self {
            assignment_timeout_ms: millis(params.assignment_timeout),
            orchestration_timeout_ms: millis(params.orchestration_timeout),
            load_step: params.load_step,
            success_rate_alpha: params.success_rate_alpha,
        }
    }
}

impl FileExecutionConfig {
    pub fn to_params(&self) -> ExecutionParams {
        ExecutionParams::default()
            .with_assignment_timeout(Duration::from_millis(self.assignment_timeout_ms))
            .with_orchestration_timeout(Duration::from_millis(self.orchestration_timeout_ms))
            .with_load_step(self.load_step)
            .with_success_rate_alpha(self.success_rate_alpha)
    }

    pub(super) fn validate(&self, issues: &mut Vec<ConfigIssue>) {
        if self.assignment_timeout_ms == 0 {
            issues.push(zero_duration("execution.assignment_timeout_ms"));
        }
        if self.orchestration_timeout_ms == 0 {
            issues.push(zero_duration("execution.orchestration_timeout_ms"));
        }
        if self.assignment_timeout_ms > self.orchestration_timeout_ms {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::AssignmentExceedsOrchestration,
                format!(
                    "execution.assignment_timeout_ms ({}) exceeds orchestration_timeout_ms ({}); \
                     assignments will never time out on their own",
                    self.assignment_timeout_ms, self.orchestration_timeout_ms
                ),
            ));
        }
        check_unit("execution.load_step", self.load_step, issues);
        check_unit("execution.success_rate_alpha", self.success_rate_alpha, issues);
    }
}

/// Raw `[retry]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRetryConfig {
    pub max_retries: u32,
    pub base_ms: u64,
    pub factor: f64,
    pub max_delay_ms: u64,
}

impl Default for FileRetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_retries: policy.max_retries,
            base_ms: millis(policy.base),
            factor: policy.factor,
            max_delay_ms: millis(policy.max_delay),
        }
    }
}

impl FileRetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries)
            .with_base(Duration::from_millis(self.base_ms))
            .with_factor(self.factor)
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
    }

    pub(super) fn validate(&self, issues: &mut Vec<ConfigIssue>) {
        if self.factor < 1.0 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::ShrinkingBackoff,
                format!("retry.factor {} is below 1; delays will shrink", self.factor),
            ));
        }
    }
}

/// Raw `[circuit]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCircuitConfig {
    pub failure_threshold: u32,
    pub cool_down_ms: u64,
}

impl Default for FileCircuitConfig {
    fn default() -> Self {
        let config = CircuitConfig::default();
        Self {
            failure_threshold: config.failure_threshold,
            cool_down_ms: millis(config.cool_down),
        }
    }
}

impl FileCircuitConfig {
    pub fn to_config(&self) -> CircuitConfig {
        CircuitConfig {
            failure_threshold: self.failure_threshold,
            cool_down: Duration::from_millis(self.cool_down_ms),
        }
    }

    pub(super) fn validate(&self, issues: &mut Vec<ConfigIssue>) {
        if self.failure_threshold == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::OutOfRange,
                "circuit.failure_threshold must be at least 1",
            ));
        }
        if self.cool_down_ms == 0 {
            issues.push(zero_duration("circuit.cool_down_ms"));
        }
    }
}

/// Raw `[health]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileHealthConfig {
    pub window: usize,
    pub available_above: f64,
    pub offline_below: f64,
    pub max_consecutive_failures: u32,
    pub error_weight: f64,
    pub timeout_weight: f64,
}

impl Default for FileHealthConfig {
    fn default() -> Self {
        let t = HealthThresholds::default();
        Self {
            window: t.window,
            available_above: t.available_above,
            offline_below: t.offline_below,
            max_consecutive_failures: t.max_consecutive_failures,
            error_weight: t.error_weight,
            timeout_weight: t.timeout_weight,
        }
    }
}

impl FileHealthConfig {
    pub fn to_thresholds(&self) -> HealthThresholds {
        HealthThresholds {
            window: self.window,
            available_above: self.available_above,
            offline_below: self.offline_below,
            max_consecutive_failures: self.max_consecutive_failures,
            error_weight: self.error_weight,
            timeout_weight: self.timeout_weight,
        }
    }

    pub(super) fn validate(&self, issues: &mut Vec<ConfigIssue>) {
        if self.window == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::OutOfRange,
                "health.window must be at least 1",
            ));
        }
        check_unit("health.available_above", self.available_above, issues);
        check_unit("health.offline_below", self.offline_below, issues);
        check_unit("health.error_weight", self.error_weight, issues);
        check_unit("health.timeout_weight", self.timeout_weight, issues);
        if self.offline_below > self.available_above {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::InvertedThresholds,
                format!(
                    "health.offline_below ({}) is above health.available_above ({})",
                    self.offline_below, self.available_above
                ),
            ));
        }
    }
}
