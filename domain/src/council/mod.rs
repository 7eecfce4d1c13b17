//! Council domain
//!
//! Several advisors answer the same question, critique each other's
//! anonymized answers, and the best-rated answer seeds a synthesis.
//!
//! ```text
//! gather ──▶ anonymize ──▶ cross-critique ──▶ tally ──▶ synthesize
//! ```

pub mod anonymize;
pub mod entities;
pub mod parsing;
pub mod scoring;

pub use anonymize::{CritiqueAssignment, anonymize, critique_assignments, label};
pub use entities::{AgentResponse, CouncilMetadata, CouncilResult, Critique, ResponseId};
pub use parsing::parse_critique;
pub use scoring::{ResponseScore, Scoreboard};
