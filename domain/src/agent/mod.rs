//! Single-agent pipeline domain: phases and outputs.

pub mod output;

pub use output::{AgentOutput, AgentRun, OutputMetadata, Phase};
