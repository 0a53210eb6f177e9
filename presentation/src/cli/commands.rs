//! CLI command definitions

use clap::{Parser, ValueEnum};
use conductor_domain::{OutputFormat as ReportFormat, Priority};
use std::path::PathBuf;

/// Output format for orchestration reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Outcome and final result only
    Summary,
    /// Outcome, attempts, errors and the checkpoint trail
    Full,
    /// The whole report as JSON
    Json,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Summary => ReportFormat::Summary,
            OutputFormat::Full => ReportFormat::Full,
            OutputFormat::Json => ReportFormat::Json,
        }
    }
}

/// Task priority as given on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PriorityArg {
    Low,
    #[default]
    Normal,
    High,
}

impl From<PriorityArg> for Priority {
    fn from(priority: PriorityArg) -> Self {
        match priority {
            PriorityArg::Low => Priority::Low,
            PriorityArg::Normal => Priority::Normal,
            PriorityArg::High => Priority::High,
        }
    }
}

/// CLI arguments for conductor
#[derive(Parser, Debug)]
#[command(name = "conductor")]
#[command(author, version, about = "Reactive multi-agent orchestration engine")]
#[command(long_about = r#"
Conductor routes a task to the agent best suited to handle it and keeps it
moving when agents fail.

Each task goes through these phases:
1. Broadcasting: find agents advertising a matching capability
2. Negotiating: capable agents bid; score = confidence x (1 - load) x success rate
3. Executing / Monitoring: the winner runs the task under a timeout
4. Aggregating: results are merged into the final payload

Failures are retried with exponential backoff, then handed to the next-ranked
agent. Agents that keep failing are isolated by a circuit breaker.

Configuration files are loaded from (in priority order):
1. CONDUCTOR_* environment variables
2. --config <path>       Explicit config file
3. ./conductor.toml      Project-level config
4. ~/.config/conductor/config.toml   Global config

Agents are declared in [[agents]] tables; without any, a small demo set is used.

Example:
  conductor "Research the latest advances in battery chemistry"
  conductor --capability booking "Table for two at 7pm"
  conductor -o json --checkpoint-log ./checkpoints.jsonl "Find flights to Lisbon"
"#)]
pub struct Cli {
    /// The task to orchestrate
    pub request: Option<String>,

    /// Capability tags to route on (skips task analysis; can be repeated)
    #[arg(short, long = "capability", value_name = "TAG")]
    pub capabilities: Vec<String>,

    /// Explicit task id (generated when omitted)
    #[arg(long, value_name = "ID")]
    pub task_id: Option<String>,

    /// Task priority
    #[arg(long, value_enum, default_value = "normal")]
    pub priority: PriorityArg,

    /// Output format (overrides [output] format)
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,

    /// Append every checkpoint to this JSONL file (overrides [logging] checkpoint_log)
    #[arg(long, value_name = "PATH")]
    pub checkpoint_log: Option<PathBuf>,
}

impl Cli {
    /// Resolves the report format: the flag wins over the configured one.
    pub fn report_format(&self, configured: Option<ReportFormat>) -> ReportFormat {
        self.output
            .map(ReportFormat::from)
            .or(configured)
            .unwrap_or_default()
    }
}
