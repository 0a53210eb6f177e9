//! CLI entrypoint for conductor
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use conductor_application::{
    MessageBus, ProgressNotifier, Supervisor, TaskAnalyzer, TaskSubmission,
};
use conductor_domain::util::truncate_str;
use conductor_domain::{CapabilitySet, OutputFormat};
use conductor_infrastructure::{
    ConfigLoader, FileConfig, JsonlCheckpointSink, PatternTaskAnalyzer, SimulatedAgent,
};
use conductor_presentation::{Cli, ConsoleFormatter, OutputFormatter, ProgressReporter};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_ref());
        return Ok(());
    }

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {e}"))?
    };

    // Keep the guard alive so the file writer flushes on exit
    let log_guard = init_logging(cli.verbose, config.logging.file.as_deref())?;

    info!("Starting conductor");

    for issue in config.ensure_valid()? {
        eprintln!("{} {}", "warning:".yellow().bold(), issue);
    }

    if !config.output.color {
        colored::control::set_override(false);
    }

    let format = cli.report_format(config.output.format);

    let Some(request) = cli.request.clone() else {
        bail!("A request is required. Run with --help for usage.");
    };

    let Some(hint) = resolve_capabilities(&cli.capabilities, &request, &config, format)? else {
        return Ok(());
    };

    // === Dependency Injection ===
    let supervisor = build_supervisor(&cli, &config, format).await?;

    let mut submission = TaskSubmission::new(request.clone())
        .with_capabilities(hint.clone())
        .with_priority(cli.priority.into());
    if let Some(task_id) = &cli.task_id {
        submission = submission.with_task_id(task_id.as_str());
    }

    if !cli.quiet && format != OutputFormat::Json {
        println!();
        println!("+============================================================+");
        println!("|           Conductor - Multi-Agent Orchestration            |");
        println!("+============================================================+");
        println!();
        println!("Request:      {}", truncate_str(&request, 200));
        println!("Capabilities: {}", hint);
        println!();
    }

    let handle = supervisor.submit(submission);
    let cancel = handle.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling orchestration");
            cancel.cancel();
        }
    });

    let report = handle.join().await;
    println!("{}", ConsoleFormatter.format(&report, format));

    let success = report.is_success();
    info!(task_id = %report.task_id, success, "Conductor finished");
    drop(log_guard);

    if !success {
        std::process::exit(1);
    }
    Ok(())
}

/// Sets up the tracing subscriber. `RUST_LOG` wins over `-v`; a log file,
/// when configured, receives the same events without ANSI colors.
fn init_logging(verbose: u8, file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console = fmt::layer().with_target(false).with_writer(std::io::stderr);

    match file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("Invalid log file path: {}", path.display()))?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .init();
            Ok(None)
        }
    }
}

/// Explicit `--capability` tags win; otherwise the request is analysed.
/// Returns `None` when the request is not something agents should handle.
fn resolve_capabilities(
    explicit: &[String],
    request: &str,
    config: &FileConfig,
    format: OutputFormat,
) -> Result<Option<CapabilitySet>> {
    if !explicit.is_empty() {
        return Ok(Some(explicit.iter().collect()));
    }

    let analyzer = PatternTaskAnalyzer::new().context("Failed to build task analyzer")?;
    let analysis = analyzer.analyze(request);
    info!(
        suitable = analysis.suitable,
        confidence = analysis.confidence,
        task_type = ?analysis.task_type,
        "Task analysed"
    );

    if analysis.should_orchestrate(config.analysis.confidence_threshold) {
        return Ok(Some(analysis.capability_hint));
    }

    if format == OutputFormat::Json {
        println!(
            "{}",
            serde_json::json!({ "skipped": true, "analysis": analysis })
        );
    } else {
        println!(
            "{} {} (confidence {:.2})",
            "Skipped:".yellow().bold(),
            analysis.reasoning,
            analysis.confidence
        );
        println!("Use --capability to route it explicitly.");
    }
    Ok(None)
}

async fn build_supervisor(
    cli: &Cli,
    config: &FileConfig,
    format: OutputFormat,
) -> Result<Supervisor> {
    let mut supervisor = Supervisor::new(MessageBus::new(), config.to_orchestrator_config());

    let checkpoint_log = cli
        .checkpoint_log
        .clone()
        .or_else(|| config.logging.checkpoint_log.clone());
    if let Some(path) = checkpoint_log {
        match JsonlCheckpointSink::new(&path) {
            Some(sink) => supervisor = supervisor.with_checkpoint_sink(Arc::new(sink)),
            None => warn!(path = %path.display(), "Checkpoint log unavailable, continuing without it"),
        }
    }

    if config.output.progress_enabled(cli.quiet, format) {
        let progress: Arc<dyn ProgressNotifier> = Arc::new(ProgressReporter::new());
        supervisor = supervisor.with_progress(progress);
    }

    let agents = if config.agents.is_empty() {
        info!("No agents configured, using the demo set");
        SimulatedAgent::demo_set()
    } else {
        config.agents.iter().map(SimulatedAgent::from_config).collect()
    };
    for agent in agents {
        let load = agent.initial_load();
        supervisor
            .attach_agent(Arc::new(agent), load)
            .await
            .context("Failed to register agent")?;
    }

    Ok(supervisor)
}
