//! Domain layer for startup-council
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Advisors
//!
//! Four specialist agents ([`AgentId`]) answer founder questions. Each agent
//! retrieves grounding context ([`ContextQuery`]), drafts an answer, optionally
//! critiques and refines it, and emits an [`AgentRun`].
//!
//! ## Council
//!
//! Several agents answer the same question, anonymously critique each other,
//! and the highest-rated answer seeds a synthesized [`CouncilResult`].
//!
//! ## Resilience
//!
//! Every external dependency sits behind a [`CircuitBreaker`] that opens after
//! repeated failures and probes recovery with a single half-open trial.

pub mod agent;
pub mod context;
pub mod core;
pub mod council;
pub mod prompt;
pub mod resilience;
pub mod util;

// Re-export commonly used types
pub use agent::{AgentOutput, AgentRun, OutputMetadata, Phase};
pub use context::{ContextOrigin, ContextQuery, ContextResult, SourceRef, normalize_text};
pub use core::{
    agent::{AgentId, RetrievalDomain},
    error::DomainError,
    request::{AdvisoryRequest, DocumentRef, DomainMetadata},
};
pub use council::{
    AgentResponse, CouncilMetadata, CouncilResult, Critique, ResponseId, Scoreboard,
    parse_critique,
};
pub use prompt::PromptTemplate;
pub use resilience::{Admission, BreakerPolicy, CircuitBreaker, CircuitState, Transition};
