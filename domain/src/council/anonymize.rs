//! Anonymized distribution of responses for cross-critique.
//!
//! Responses are shuffled with a uniform random permutation before they
//! are handed to critics, so presentation order carries no hint of which
//! agent wrote what. Critics see neutral labels ("Response A", ...) that
//! are assigned after the shuffle.

use super::entities::AgentResponse;
use crate::core::agent::AgentId;
use rand::Rng;
use rand::seq::SliceRandom;

/// Uniformly permute responses (Fisher-Yates via [`SliceRandom::shuffle`])
pub fn anonymize<R: Rng + ?Sized>(mut responses: Vec<AgentResponse>, rng: &mut R) -> Vec<AgentResponse> {
    responses.shuffle(rng);
    responses
}

/// Neutral label for the response at `index` in anonymized order
pub fn label(index: usize) -> String {
    let letter = (b'A' + (index % 26) as u8) as char;
    if index < 26 {
        format!("Response {}", letter)
    } else {
        format!("Response {}{}", letter, index / 26)
    }
}

/// One critique assignment: `critic` reviews the response at `target`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CritiqueAssignment {
    pub critic: AgentId,
    pub target: usize,
}

/// Every ordered (critic, other response) pair, excluding self-critique.
///
/// Critics are the authors of the surviving responses.
pub fn critique_assignments(responses: &[AgentResponse]) -> Vec<CritiqueAssignment> {
    responses
        .iter()
        .flat_map(|critic| {
            responses
                .iter()
                .enumerate()
                .filter(move |(_, target)| target.agent != critic.agent)
                .map(move |(target, _)| CritiqueAssignment {
                    critic: critic.agent,
                    target,
                })
        })
        .collect()
}
