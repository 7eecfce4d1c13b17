//! Agent identifier value object

use super::error::DomainError;
use serde::{Deserialize, Serialize};

/// Advisory agents available to the council (Value Object)
///
/// Each agent has its own system prompt and retrieval domain. The set is
/// fixed; callers pick a subset per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentId {
    Legal,
    Finance,
    Investor,
    Competitor,
}

/// Document domains indexed by the retrieval service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalDomain {
    Legal,
    Finance,
}

impl RetrievalDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalDomain::Legal => "legal",
            RetrievalDomain::Finance => "finance",
        }
    }
}

impl AgentId {
    /// Get the string identifier for this agent
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentId::Legal => "legal",
            AgentId::Finance => "finance",
            AgentId::Investor => "investor",
            AgentId::Competitor => "competitor",
        }
    }

    /// All agents, in a stable order
    pub fn all() -> [AgentId; 4] {
        [
            AgentId::Legal,
            AgentId::Finance,
            AgentId::Investor,
            AgentId::Competitor,
        ]
    }

    /// Retrieval domain this agent draws its context from.
    ///
    /// Only legal and finance documents are indexed; investor and
    /// competitor analysis rely on the finance corpus.
    pub fn retrieval_domain(&self) -> RetrievalDomain {
        match self {
            AgentId::Legal => RetrievalDomain::Legal,
            AgentId::Finance | AgentId::Investor | AgentId::Competitor => {
                RetrievalDomain::Finance
            }
        }
    }

    /// Human-readable role name used in prompts
    pub fn role(&self) -> &'static str {
        match self {
            AgentId::Legal => "Legal Advisor",
            AgentId::Finance => "Finance Advisor",
            AgentId::Investor => "Investor Relations Advisor",
            AgentId::Competitor => "Competitive Intelligence Analyst",
        }
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AgentId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "legal" => Ok(AgentId::Legal),
            "finance" => Ok(AgentId::Finance),
            "investor" => Ok(AgentId::Investor),
            "competitor" => Ok(AgentId::Competitor),
            other => Err(DomainError::UnknownAgent(other.to_string())),
        }
    }
}
