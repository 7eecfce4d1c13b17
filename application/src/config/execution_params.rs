//! Execution parameters - use case control.
//!
//! [`PipelineParams`] drives [`RunAgentUseCase`](crate::use_cases::run_agent::RunAgentUseCase)
//! and [`CouncilParams`] drives
//! [`RunCouncilUseCase`](crate::use_cases::run_council::RunCouncilUseCase).
//! These are application-layer concerns, not domain policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Single-agent pipeline parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineParams {
    /// Run the self-critique pass between draft and final.
    pub self_critique: bool,
    /// Refine the draft only when its self-critique score is below this.
    pub refine_below: u8,
    pub draft_temperature: f32,
    pub draft_max_tokens: u32,
    pub self_critique_temperature: f32,
    pub self_critique_max_tokens: u32,
    /// Number of chunks requested from retrieval.
    pub retrieval_limit: u8,
    /// Caller-level bound on one single-agent request.
    pub request_timeout: Duration,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            self_critique: true,
            refine_below: 9,
            draft_temperature: 0.4,
            draft_max_tokens: 2048,
            self_critique_temperature: 0.2,
            self_critique_max_tokens: 200,
            retrieval_limit: 5,
            request_timeout: Duration::from_secs(180),
        }
    }
}

impl PipelineParams {
    // ==================== Builder Methods ====================

    pub fn with_self_critique(mut self, enabled: bool) -> Self {
        self.self_critique = enabled;
        self
    }

    pub fn with_retrieval_limit(mut self, limit: u8) -> Self {
        self.retrieval_limit = limit;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Council round parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouncilParams {
    /// Surviving responses required to enter the critique round.
    pub min_responses: usize,
    /// Maximum critique calls in flight.
    pub critique_concurrency: usize,
    pub critique_temperature: f32,
    pub critique_max_tokens: u32,
    pub synthesis_temperature: f32,
    pub synthesis_max_tokens: u32,
    /// Bytes of each non-seed response shown to the synthesizer.
    pub excerpt_chars: usize,
    /// Caller-level bound on the whole council run.
    pub request_timeout: Duration,
}

impl Default for CouncilParams {
    fn default() -> Self {
        Self {
            min_responses: 2,
            critique_concurrency: 4,
            critique_temperature: 0.2,
            critique_max_tokens: 200,
            synthesis_temperature: 0.3,
            synthesis_max_tokens: 2048,
            excerpt_chars: 600,
            request_timeout: Duration::from_secs(240),
        }
    }
}

impl CouncilParams {
    pub fn with_critique_concurrency(mut self, max: usize) -> Self {
        self.critique_concurrency = max;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
