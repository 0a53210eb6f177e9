//! Progress reporting for orchestrations

use colored::Colorize;
use conductor_application::ProgressNotifier;
use conductor_domain::util::truncate_str;
use conductor_domain::{AgentId, AgentMessage, OrchestrationError, Phase, ScoredBid, TaskId};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Reports progress with one spinner per running orchestration
pub struct ProgressReporter {
    multi: MultiProgress,
    bars: Mutex<HashMap<TaskId, ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn short_id(task_id: &TaskId) -> String {
        task_id.as_str().chars().take(8).collect()
    }

    /// Runs `f` on the task's bar, creating it on first use.
    fn with_bar(&self, task_id: &TaskId, f: impl FnOnce(&ProgressBar)) {
        let Ok(mut bars) = self.bars.lock() else {
            return;
        };
        let bar = bars.entry(task_id.clone()).or_insert_with(|| {
            let pb = self.multi.add(ProgressBar::new_spinner());
            pb.set_style(Self::spinner_style());
            pb.set_prefix(Self::short_id(task_id));
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });
        f(bar);
    }

    fn finish(&self, task_id: &TaskId, message: String) {
        if let Ok(mut bars) = self.bars.lock()
            && let Some(pb) = bars.remove(task_id)
        {
            pb.finish_with_message(message);
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressNotifier for ProgressReporter {
    fn on_phase_change(&self, task_id: &TaskId, _from: Phase, to: Phase) {
        match to {
            Phase::Completed => {
                self.finish(task_id, format!("{} {}", "v".green(), to.display_name()))
            }
            Phase::Failed => {
                self.finish(task_id, format!("{} {}", "x".red(), to.display_name()))
            }
            _ => self.with_bar(task_id, |pb| {
                pb.set_message(format!("{}...", to.display_name()));
            }),
        }
    }

    fn on_assignment(&self, task_id: &TaskId, agent_id: &AgentId, attempt: u32) {
        self.with_bar(task_id, |pb| {
            pb.set_message(format!("Executing on {} (attempt {})", agent_id, attempt));
        });
    }

    fn on_assignment_complete(&self, task_id: &TaskId, agent_id: &AgentId, success: bool) {
        let status = if success {
            format!("{} {}", "v".green(), agent_id)
        } else {
            format!("{} {}", "x".red(), agent_id)
        };
        self.with_bar(task_id, |pb| pb.set_message(status));
    }

    fn on_negotiation_complete(&self, task_id: &TaskId, ranking: &[ScoredBid]) {
        if let Some(winner) = ranking.first() {
            self.with_bar(task_id, |pb| {
                pb.set_message(format!(
                    "{} won with {:.3} ({} bids)",
                    winner.agent_id(),
                    winner.score,
                    ranking.len()
                ));
            });
        }
    }

    fn on_agent_status(&self, task_id: &TaskId, message: &AgentMessage) {
        if let Some(state) = message.content().get("state").and_then(|v| v.as_str()) {
            let text = format!("{}: {}", message.from(), truncate_str(state, 60));
            self.with_bar(task_id, |pb| pb.set_message(text));
        }
    }

    fn on_retry_scheduled(&self, task_id: &TaskId, agent_id: &AgentId, delay: Duration) {
        self.with_bar(task_id, |pb| {
            pb.set_message(format!(
                "{} retrying {} in {}ms",
                "!".yellow(),
                agent_id,
                delay.as_millis()
            ));
        });
    }

    fn on_fallback(&self, task_id: &TaskId, from: &AgentId, to: &AgentId) {
        self.with_bar(task_id, |pb| {
            pb.set_message(format!("{} falling back {} -> {}", "!".yellow(), from, to));
        });
    }
}

/// Simple text-based progress (no fancy UI)
pub struct SimpleProgress;

impl ProgressNotifier for SimpleProgress {
    fn on_phase_change(&self, _task_id: &TaskId, _from: Phase, to: Phase) {
        match to {
            Phase::Completed => println!("{} {}", "v".green(), to.display_name().bold()),
            Phase::Failed => println!("{} {}", "x".red(), to.display_name().bold()),
            _ => println!("{} {}", "->".cyan(), to.display_name().bold()),
        }
    }

    fn on_assignment(&self, _task_id: &TaskId, agent_id: &AgentId, attempt: u32) {
        println!("  {} (attempt {})", agent_id, attempt);
    }

    fn on_assignment_complete(&self, _task_id: &TaskId, agent_id: &AgentId, success: bool) {
        if success {
            println!("  {} {}", "v".green(), agent_id);
        } else {
            println!("  {} {} (failed)", "x".red(), agent_id);
        }
    }

    fn on_negotiation_complete(&self, _task_id: &TaskId, ranking: &[ScoredBid]) {
        for bid in ranking {
            println!("  {} {:.3}", bid.agent_id(), bid.score);
        }
    }

    fn on_retry_scheduled(&self, _task_id: &TaskId, agent_id: &AgentId, delay: Duration) {
        println!(
            "  {} retry {} in {}ms",
            "!".yellow(),
            agent_id,
            delay.as_millis()
        );
    }

    fn on_fallback(&self, _task_id: &TaskId, from: &AgentId, to: &AgentId) {
        println!("  {} fallback {} -> {}", "!".yellow(), from, to);
    }

    fn on_failed(&self, _task_id: &TaskId, reason: &OrchestrationError) {
        println!("  {} {}", "x".red(), reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reporter_drops_bar_on_terminal_phase() {
        let reporter = ProgressReporter::new();
        let task = TaskId::new("task-123456789");

        reporter.on_phase_change(&task, Phase::Initializing, Phase::Broadcasting);
        reporter.on_assignment(&task, &AgentId::new("a"), 1);
        assert_eq!(reporter.bars.lock().unwrap().len(), 1);

        reporter.on_phase_change(&task, Phase::Aggregating, Phase::Completed);
        assert!(reporter.bars.lock().unwrap().is_empty());
    }

    #[test]
    fn test_bars_are_per_task() {
        let reporter = ProgressReporter::new();
        reporter.on_phase_change(&TaskId::new("t1"), Phase::Initializing, Phase::Broadcasting);
        reporter.on_phase_change(&TaskId::new("t2"), Phase::Initializing, Phase::Broadcasting);
        assert_eq!(reporter.bars.lock().unwrap().len(), 2);

        reporter.on_phase_change(&TaskId::new("t1"), Phase::Broadcasting, Phase::Failed);
        assert_eq!(reporter.bars.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_short_id() {
        assert_eq!(ProgressReporter::short_id(&TaskId::new("abcdefghijk")), "abcdefgh");
        assert_eq!(ProgressReporter::short_id(&TaskId::new("t1")), "t1");
    }
}
