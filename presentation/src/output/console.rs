//! Console output formatter for orchestration reports

use crate::output::formatter::OutputFormatter;
use colored::Colorize;
use conductor_domain::{OrchestrationOutcome, OrchestrationReport};
use serde_json::Value;

/// Formats orchestration reports for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Outcome and final result only
    pub fn format_summary(report: &OrchestrationReport) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Orchestration Result"));
        output.push('\n');
        output.push_str(&Self::outcome_block(report));
        output.push_str(&Self::footer());

        output
    }

    /// Outcome plus attempts, errors and the checkpoint trail
    pub fn format_full(report: &OrchestrationReport) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Orchestration Report"));
        output.push('\n');
        output.push_str(&Self::outcome_block(report));

        output.push_str(&format!(
            "\n{} {}\n",
            "Negotiation rounds:".cyan().bold(),
            report.negotiation_rounds
        ));

        output.push_str(&Self::section_header("Attempts"));
        if report.attempts.is_empty() {
            output.push_str(&format!("  {}\n", "(none)".dimmed()));
        }
        for (i, agent_id) in report.attempts.iter().enumerate() {
            let mark = if report.results.contains_key(agent_id.as_str()) {
                "v".green()
            } else {
                "x".red()
            };
            output.push_str(&format!("  {}. {} {}\n", i + 1, mark, agent_id));
        }

        if !report.errors.is_empty() {
            output.push_str(&Self::section_header("Errors"));
            for record in &report.errors {
                let agent = record
                    .agent_id
                    .as_ref()
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "-".to_string());
                output.push_str(&format!(
                    "  [{}] {} {}: {}\n",
                    record.attempt,
                    agent.yellow(),
                    record.kind.dimmed(),
                    record.message
                ));
            }
        }

        if !report.checkpoints.is_empty() {
            output.push_str(&Self::section_header("Checkpoints"));
            let start = report.checkpoints[0].timestamp;
            for checkpoint in &report.checkpoints {
                let assignee = checkpoint
                    .assignee
                    .as_ref()
                    .map(|id| format!(" ({})", id))
                    .unwrap_or_default();
                output.push_str(&format!(
                    "  +{:>6}ms {}{} retries={} errors={}\n",
                    checkpoint.timestamp.saturating_sub(start),
                    checkpoint.phase.as_str().bold(),
                    assignee,
                    checkpoint.retry_count,
                    checkpoint.errors_so_far.len()
                ));
            }
        }

        output.push_str(&Self::footer());

        output
    }

    /// Format as JSON
    pub fn format_json(report: &OrchestrationReport) -> String {
        serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
    }

    fn outcome_block(report: &OrchestrationReport) -> String {
        let mut output = format!("{} {}\n", "Task:".cyan().bold(), report.task_id);

        match &report.outcome {
            OrchestrationOutcome::Completed { result } => {
                output.push_str(&format!(
                    "{} {}\n",
                    "Status:".cyan().bold(),
                    "completed".green().bold()
                ));
                if let Some(agent_id) = report.attempts.last() {
                    output.push_str(&format!("{} {}\n", "Handled by:".cyan().bold(), agent_id));
                }
                output.push_str(&format!(
                    "\n{}\n{}\n",
                    "Result:".cyan().bold(),
                    Self::indent(&Self::render_value(result), "  ")
                ));
            }
            OrchestrationOutcome::Failed { reason, attempts } => {
                output.push_str(&format!(
                    "{} {}\n",
                    "Status:".cyan().bold(),
                    "failed".red().bold()
                ));
                output.push_str(&format!("{} {}\n", "Reason:".cyan().bold(), reason));
                output.push_str(&format!("{} {}\n", "Attempts:".cyan().bold(), attempts));
            }
        }

        output
    }

    fn render_value(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format_summary(&self, report: &OrchestrationReport) -> String {
        Self::format_summary(report)
    }

    fn format_full(&self, report: &OrchestrationReport) -> String {
        Self::format_full(report)
    }

    fn format_json(&self, report: &OrchestrationReport) -> String {
        Self::format_json(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_domain::{
        AgentId, ErrorRecord, OrchestrationError, OutputFormat, Phase, TaskId,
    };
    use serde_json::json;

    fn completed() -> OrchestrationReport {
        let mut report =
            OrchestrationReport::aborted(TaskId::new("task-1"), OrchestrationError::Cancelled);
        report.phase = Phase::Completed;
        report.errors = vec![ErrorRecord::new(
            Some(AgentId::new("slow_agent")),
            1,
            OrchestrationError::AgentTimeout {
                agent_id: AgentId::new("slow_agent"),
                timeout_ms: 1000,
            },
        )];
        report.attempts = vec![AgentId::new("slow_agent"), AgentId::new("search_agent")];
        report
            .results
            .insert("search_agent".to_string(), json!({"summary": "found it"}));
        report.outcome = OrchestrationOutcome::Completed {
            result: json!({"summary": "found it"}),
        };
        report
    }

    #[test]
    fn test_summary_shows_result_and_handler() {
        let out = ConsoleFormatter::format_summary(&completed());
        assert!(out.contains("task-1"));
        assert!(out.contains("completed"));
        assert!(out.contains("search_agent"));
        assert!(out.contains("found it"));
        assert!(!out.contains("Checkpoints"));
    }

    #[test]
    fn test_summary_shows_failure_reason() {
        let report = OrchestrationReport::aborted(
            TaskId::new("task-2"),
            OrchestrationError::NoCapableAgent {
                hint: "booking".to_string(),
            },
        );
        let out = ConsoleFormatter::format_summary(&report);
        assert!(out.contains("failed"));
        assert!(out.contains("No registered agent can handle capability 'booking'"));
    }

    #[test]
    fn test_full_lists_attempts_and_errors() {
        let out = ConsoleFormatter::format_full(&completed());
        assert!(out.contains("Attempts"));
        assert!(out.contains("1. "));
        assert!(out.contains("2. "));
        assert!(out.contains("Agent slow_agent timed out after 1000ms"));
    }

    #[test]
    fn test_json_round_trips() {
        let report = completed();
        let out = ConsoleFormatter.format(&report, OutputFormat::Json);
        let parsed: OrchestrationReport = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn test_indent() {
        assert_eq!(ConsoleFormatter::indent("a\nb", "  "), "  a\n  b");
    }
}
