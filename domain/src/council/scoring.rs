//! Critique aggregation: per-response averages, seed selection and consensus.

use super::entities::{AgentResponse, Critique, ResponseId};
use crate::core::agent::AgentId;

/// Aggregated critique scores for one response
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseScore {
    pub response_id: ResponseId,
    pub agent: AgentId,
    /// Mean of received scores; `None` when no critique arrived
    pub average: Option<f64>,
    pub critique_count: usize,
    /// Score this response contributes to the consensus
    pub consensus_weight: f64,
}

/// Scores for every response of a council round
#[derive(Debug, Clone, PartialEq)]
pub struct Scoreboard {
    scores: Vec<ResponseScore>,
}

impl Scoreboard {
    /// Aggregate critiques by `response_id`.
    ///
    /// Critiques referring to unknown responses are ignored. A response that
    /// received no critiques contributes its own confidence (scaled to 1-10)
    /// to the consensus but can never become the seed.
    pub fn tally(responses: &[AgentResponse], critiques: &[Critique]) -> Self {
        let scores = responses
            .iter()
            .map(|response| {
                let received: Vec<u8> = critiques
                    .iter()
                    .filter(|c| c.response_id == response.id)
                    .map(|c| c.score)
                    .collect();

                let average = (!received.is_empty()).then(|| {
                    received.iter().map(|&s| f64::from(s)).sum::<f64>() / received.len() as f64
                });

                ResponseScore {
                    response_id: response.id.clone(),
                    agent: response.agent,
                    average,
                    critique_count: received.len(),
                    consensus_weight: average
                        .unwrap_or_else(|| (response.confidence * 10.0).clamp(1.0, 10.0)),
                }
            })
            .collect();

        Self { scores }
    }

    pub fn scores(&self) -> &[ResponseScore] {
        &self.scores
    }

    pub fn get(&self, response_id: &ResponseId) -> Option<&ResponseScore> {
        self.scores.iter().find(|s| &s.response_id == response_id)
    }

    /// Highest-averaged critiqued response; earliest wins ties
    pub fn seed(&self) -> Option<&ResponseScore> {
        self.scores
            .iter()
            .filter_map(|s| s.average.map(|avg| (s, avg)))
            .fold(None, |best: Option<(&ResponseScore, f64)>, (s, avg)| match best {
                Some((_, best_avg)) if best_avg >= avg => best,
                _ => Some((s, avg)),
            })
            .map(|(s, _)| s)
    }

    /// Mean of every response's consensus weight, on the 1-10 scale
    pub fn consensus_score(&self) -> f64 {
        if self.scores.is_empty() {
            return 0.0;
        }
        self.scores.iter().map(|s| s.consensus_weight).sum::<f64>() / self.scores.len() as f64
    }
}
