//! Council value objects - per-agent responses, critiques and the final result.
//!
//! - [`AgentResponse`] - one agent's final answer entering the critique round
//! - [`Critique`] - one agent's score for another agent's response
//! - [`CouncilResult`] - synthesized answer plus [`CouncilMetadata`]

use crate::agent::AgentOutput;
use crate::core::agent::AgentId;
use serde::{Deserialize, Serialize};

/// Opaque identifier of a response inside one council run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseId(String);

impl ResponseId {
    /// Generate a fresh random id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResponseId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for ResponseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An agent's final-phase answer, as seen by the critique round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub agent: AgentId,
    pub id: ResponseId,
    pub content: String,
    pub confidence: f64,
    pub sources: Vec<String>,
}

impl AgentResponse {
    pub fn new(
        agent: AgentId,
        id: ResponseId,
        content: impl Into<String>,
        confidence: f64,
        sources: Vec<String>,
    ) -> Self {
        Self {
            agent,
            id,
            content: content.into(),
            confidence: crate::agent::output::clamp_unit(confidence),
            sources,
        }
    }

    /// Wrap an agent's final output under a freshly generated id
    pub fn from_output(output: &AgentOutput) -> Self {
        Self::new(
            output.agent,
            ResponseId::generate(),
            output.content.clone(),
            output.confidence,
            output.sources.clone(),
        )
    }
}

/// One critic's verdict on one response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Critique {
    pub response_id: ResponseId,
    pub critic: AgentId,
    /// Integer score in `1..=10`
    pub score: u8,
    pub feedback: String,
}

impl Critique {
    pub fn new(
        response_id: ResponseId,
        critic: AgentId,
        score: u8,
        feedback: impl Into<String>,
    ) -> Self {
        Self {
            response_id,
            critic,
            score: score.clamp(1, 10),
            feedback: feedback.into(),
        }
    }
}

/// Provenance of a council answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouncilMetadata {
    /// Agents whose responses entered the critique round
    pub agents_used: Vec<AgentId>,
    /// Agents that produced no result during gather
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_agents: Vec<AgentId>,
    /// Usable critiques collected
    pub critique_count: usize,
    /// Mean of per-response average scores, on the 1-10 scale
    pub consensus_score: f64,
    /// Agent whose response seeded the synthesis
    pub seed_agent: AgentId,
    /// False when synthesis failed and the seed was returned verbatim
    pub synthesized: bool,
}

/// Final council answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouncilResult {
    pub content: String,
    /// `consensus_score / 10`
    pub confidence: f64,
    pub sources: Vec<String>,
    pub council_metadata: CouncilMetadata,
}
