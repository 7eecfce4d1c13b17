//! Agent pipeline outputs

use crate::context::ContextOrigin;
use crate::core::agent::AgentId;
use serde::{Deserialize, Serialize};

/// Stage of a single-agent pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Draft,
    Critique,
    Final,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Draft => "draft",
            Phase::Critique => "critique",
            Phase::Final => "final",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Provenance attached to every agent output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputMetadata {
    pub context_origin: ContextOrigin,
    pub chunks_found: usize,
    /// Backends that produced the text
    #[serde(default)]
    pub backends: Vec<String>,
    /// Score from the self-critique pass, if one ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_critique_score: Option<u8>,
    /// True when the final text is a refinement of the draft
    #[serde(default)]
    pub refined: bool,
}

impl OutputMetadata {
    pub fn new(context_origin: ContextOrigin, chunks_found: usize) -> Self {
        Self {
            context_origin,
            chunks_found,
            backends: Vec::new(),
            self_critique_score: None,
            refined: false,
        }
    }
}

/// One phase's output from one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutput {
    pub agent: AgentId,
    pub phase: Phase,
    pub content: String,
    /// Confidence in `[0, 1]`
    pub confidence: f64,
    pub sources: Vec<String>,
    pub metadata: OutputMetadata,
}

impl AgentOutput {
    pub fn new(
        agent: AgentId,
        phase: Phase,
        content: impl Into<String>,
        confidence: f64,
        sources: Vec<String>,
        metadata: OutputMetadata,
    ) -> Self {
        Self {
            agent,
            phase,
            content: content.into(),
            confidence: clamp_unit(confidence),
            sources,
            metadata,
        }
    }

    /// Re-label this output as a different phase, keeping everything else
    pub fn as_phase(&self, phase: Phase) -> Self {
        Self {
            phase,
            ..self.clone()
        }
    }
}

/// All outputs of one agent invocation.
///
/// Construction guarantees exactly one [`Phase::Final`] output, which is
/// always the last entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRun {
    agent: AgentId,
    outputs: Vec<AgentOutput>,
}

impl AgentRun {
    /// Assemble a run from its intermediate outputs and the final one.
    ///
    /// Intermediate outputs claiming the final phase are dropped.
    pub fn new(agent: AgentId, intermediate: Vec<AgentOutput>, final_output: AgentOutput) -> Self {
        let mut outputs: Vec<AgentOutput> = intermediate
            .into_iter()
            .filter(|o| o.phase != Phase::Final)
            .collect();
        outputs.push(final_output.as_phase(Phase::Final));
        Self { agent, outputs }
    }

    pub fn agent(&self) -> AgentId {
        self.agent
    }

    pub fn outputs(&self) -> &[AgentOutput] {
        &self.outputs
    }

    pub fn output(&self, phase: Phase) -> Option<&AgentOutput> {
        self.outputs.iter().find(|o| o.phase == phase)
    }

    pub fn final_output(&self) -> &AgentOutput {
        // `new` always pushes the final output last
        &self.outputs[self.outputs.len() - 1]
    }

    pub fn into_final(mut self) -> AgentOutput {
        let last = self.outputs.len() - 1;
        self.outputs.swap_remove(last)
    }
}

pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(phase: Phase, content: &str) -> AgentOutput {
        AgentOutput::new(
            AgentId::Finance,
            phase,
            content,
            0.8,
            vec![],
            OutputMetadata::new(ContextOrigin::Live, 2),
        )
    }

    #[test]
    fn test_run_has_exactly_one_final() {
        let run = AgentRun::new(
            AgentId::Finance,
            vec![output(Phase::Draft, "draft"), output(Phase::Final, "bogus")],
            output(Phase::Draft, "final text"),
        );

        let finals: Vec<_> = run
            .outputs()
            .iter()
            .filter(|o| o.phase == Phase::Final)
            .collect();
        assert_eq!(finals.len(), 1);
        assert_eq!(run.final_output().content, "final text");
        assert_eq!(run.output(Phase::Draft).map(|o| o.content.as_str()), Some("draft"));
    }

    #[test]
    fn test_into_final() {
        let run = AgentRun::new(
            AgentId::Finance,
            vec![output(Phase::Draft, "draft")],
            output(Phase::Final, "done"),
        );
        let final_output = run.into_final();
        assert_eq!(final_output.phase, Phase::Final);
        assert_eq!(final_output.content, "done");
    }

    #[test]
    fn test_confidence_clamped() {
        let mut o = output(Phase::Draft, "x");
        o = AgentOutput::new(o.agent, o.phase, o.content, 3.0, o.sources, o.metadata);
        assert_eq!(o.confidence, 1.0);
    }
}
