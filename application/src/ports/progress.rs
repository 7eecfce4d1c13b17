//! Progress notification port
//!
//! Defines the interface for reporting progress during a council run.

use council_domain::AgentId;

/// Stages of a council run that report progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CouncilPhase {
    Gather,
    Critique,
    Synthesis,
}

impl CouncilPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CouncilPhase::Gather => "gather",
            CouncilPhase::Critique => "critique",
            CouncilPhase::Synthesis => "synthesis",
        }
    }
}

impl std::fmt::Display for CouncilPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Callback for progress updates during a council run
///
/// Implementations live in the presentation layer and can display
/// progress in various ways (progress bars, plain log lines, etc.)
pub trait ProgressNotifier: Send + Sync {
    /// Called when a phase starts
    fn on_phase_start(&self, phase: CouncilPhase, total_tasks: usize);

    /// Called when a task completes within a phase
    fn on_task_complete(&self, phase: CouncilPhase, agent: AgentId, success: bool);

    /// Called when a phase completes
    fn on_phase_complete(&self, phase: CouncilPhase);
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl ProgressNotifier for NoProgress {
    fn on_phase_start(&self, _phase: CouncilPhase, _total_tasks: usize) {}
    fn on_task_complete(&self, _phase: CouncilPhase, _agent: AgentId, _success: bool) {}
    fn on_phase_complete(&self, _phase: CouncilPhase) {}
}
