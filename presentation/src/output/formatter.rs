//! Output formatter trait

use conductor_domain::{OrchestrationReport, OutputFormat};

/// Trait for formatting orchestration reports
pub trait OutputFormatter {
    /// Outcome and final result only
    fn format_summary(&self, report: &OrchestrationReport) -> String;

    /// Outcome, attempts, errors and the checkpoint trail
    fn format_full(&self, report: &OrchestrationReport) -> String;

    /// The whole report as JSON
    fn format_json(&self, report: &OrchestrationReport) -> String;

    fn format(&self, report: &OrchestrationReport, format: OutputFormat) -> String {
        match format {
            OutputFormat::Summary => self.format_summary(report),
            OutputFormat::Full => self.format_full(report),
            OutputFormat::Json => self.format_json(report),
        }
    }
}
