//! Port for structured council transcripts.
//!
//! Defines the [`CouncilLogger`] trait for recording what happened during a
//! run (agent outputs, critiques, synthesis, the final result) to a
//! machine-readable log.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostics, while this port captures the transcript.

use serde_json::Value;

/// A structured council event.
pub struct CouncilEvent {
    /// Event type identifier (e.g., "agent_output", "critique", "council_result").
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl CouncilEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for logging council events.
///
/// `log` is synchronous and infallible; write failures are ignored so the
/// run itself is never disturbed.
pub trait CouncilLogger: Send + Sync {
    fn log(&self, event: CouncilEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoCouncilLogger;

impl CouncilLogger for NoCouncilLogger {
    fn log(&self, _event: CouncilEvent) {}
}
