//! Progress reporting for council execution

use colored::Colorize;
use council_application::{CouncilPhase, ProgressNotifier};
use council_domain::AgentId;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Mutex;

/// Reports progress during a council run with progress bars
pub struct ProgressReporter {
    multi: MultiProgress,
    phase_bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            phase_bar: Mutex::new(None),
        }
    }

    fn phase_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn phase_display_name(phase: CouncilPhase) -> &'static str {
        match phase {
            CouncilPhase::Gather => "Gathering answers",
            CouncilPhase::Critique => "Cross-critique",
            CouncilPhase::Synthesis => "Synthesis",
        }
    }

    fn task_label(phase: CouncilPhase, agent: AgentId, success: bool) -> String {
        let mark = if success { "v".green() } else { "x".red() };
        match phase {
            CouncilPhase::Critique => format!("{} critique by {}", mark, agent),
            _ => format!("{} {}", mark, agent),
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressNotifier for ProgressReporter {
    fn on_phase_start(&self, phase: CouncilPhase, total_tasks: usize) {
        let pb = self.multi.add(ProgressBar::new(total_tasks as u64));
        pb.set_style(Self::phase_style());
        pb.set_prefix(Self::phase_display_name(phase));
        pb.set_message("Starting...");

        *self.phase_bar.lock().unwrap_or_else(|e| e.into_inner()) = Some(pb);
    }

    fn on_task_complete(&self, phase: CouncilPhase, agent: AgentId, success: bool) {
        if let Some(pb) = self
            .phase_bar
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
        {
            pb.set_message(Self::task_label(phase, agent, success));
            pb.inc(1);
        }
    }

    fn on_phase_complete(&self, phase: CouncilPhase) {
        if let Some(pb) = self
            .phase_bar
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            pb.finish_with_message(format!("{} done", Self::phase_display_name(phase).green()));
        }
    }
}

/// Simple text-based progress (no fancy UI), written to stderr
pub struct SimpleProgress;

impl ProgressNotifier for SimpleProgress {
    fn on_phase_start(&self, phase: CouncilPhase, total_tasks: usize) {
        eprintln!(
            "{} {} ({} tasks)",
            "->".cyan(),
            ProgressReporter::phase_display_name(phase).bold(),
            total_tasks
        );
    }

    fn on_task_complete(&self, phase: CouncilPhase, agent: AgentId, success: bool) {
        eprintln!("  {}", ProgressReporter::task_label(phase, agent, success));
    }

    fn on_phase_complete(&self, _phase: CouncilPhase) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_labels() {
        colored::control::set_override(false);
        assert_eq!(
            ProgressReporter::task_label(CouncilPhase::Critique, AgentId::Legal, true),
            "v critique by legal"
        );
        assert_eq!(
            ProgressReporter::task_label(CouncilPhase::Gather, AgentId::Finance, false),
            "x finance"
        );
    }

    #[test]
    fn test_reporter_tolerates_out_of_order_calls() {
        let reporter = ProgressReporter::new();
        reporter.on_task_complete(CouncilPhase::Gather, AgentId::Legal, true);
        reporter.on_phase_complete(CouncilPhase::Gather);
        reporter.on_phase_start(CouncilPhase::Critique, 2);
        reporter.on_task_complete(CouncilPhase::Critique, AgentId::Legal, true);
        reporter.on_phase_complete(CouncilPhase::Critique);
        assert!(reporter.phase_bar.lock().unwrap().is_none());
    }
}
