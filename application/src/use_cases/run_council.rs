//! Run Council use case
//!
//! Orchestrates the multi-agent critique and synthesis flow:
//!
//! ```text
//! ┌────────┐   ┌───────────┐   ┌────────────────┐   ┌───────┐   ┌────────────┐
//! │ Gather │──▶│ Anonymize │──▶│ Cross-critique │──▶│ Score │──▶│ Synthesize │
//! └────────┘   └───────────┘   └────────────────┘   └───────┘   └────────────┘
//!  parallel     shuffle          bounded parallel     average     seed fallback
//! ```
//!
//! Gather and critique tolerate partial failure. Too few survivors or zero
//! usable critiques fail the whole run; a failed synthesis returns the seed.

use crate::config::CouncilParams;
use crate::ports::council_logger::{CouncilEvent, CouncilLogger, NoCouncilLogger};
use crate::ports::progress::{CouncilPhase, NoProgress, ProgressNotifier};
use crate::services::model_invoker::{InvokeOptions, ModelInvoker};
use crate::use_cases::run_agent::{RunAgentInput, RunAgentUseCase};
use council_domain::council::{CritiqueAssignment, anonymize, critique_assignments, label};
use council_domain::{
    AdvisoryRequest, AgentId, AgentResponse, CouncilMetadata, CouncilResult, Critique,
    DomainError, PromptTemplate, Scoreboard, parse_critique,
};
use futures::{StreamExt, future, stream};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors that can occur during a council run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RunCouncilError {
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] DomainError),

    #[error("A council needs at least {required} distinct agents, got {requested}")]
    TooFewAgents { requested: usize, required: usize },

    #[error("Insufficient responses for critique: {received} of {required} required")]
    InsufficientResponses { required: usize, received: usize },

    #[error("Critique phase failed: no usable critiques")]
    CritiquePhaseFailed,

    #[error("Council request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Operation cancelled")]
    Cancelled,
}

impl RunCouncilError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunCouncilError::Cancelled)
    }
}

/// Input for the RunCouncil use case
#[derive(Debug, Clone)]
pub struct RunCouncilInput {
    pub agents: Vec<AgentId>,
    pub request: AdvisoryRequest,
}

impl RunCouncilInput {
    pub fn new(agents: impl IntoIterator<Item = AgentId>, request: AdvisoryRequest) -> Self {
        Self {
            agents: agents.into_iter().collect(),
            request,
        }
    }
}

/// Use case for running a council
pub struct RunCouncilUseCase {
    agent: RunAgentUseCase,
    invoker: Arc<ModelInvoker>,
    params: CouncilParams,
    logger: Arc<dyn CouncilLogger>,
    cancellation_token: Option<CancellationToken>,
}

impl RunCouncilUseCase {
    pub fn new(agent: RunAgentUseCase, invoker: Arc<ModelInvoker>, params: CouncilParams) -> Self {
        Self {
            agent,
            invoker,
            params,
            logger: Arc::new(NoCouncilLogger),
            cancellation_token: None,
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn CouncilLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Set a cancellation token for graceful interruption
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Execute the use case with default (no-op) progress
    pub async fn execute(&self, input: RunCouncilInput) -> Result<CouncilResult, RunCouncilError> {
        self.execute_with_progress(input, &NoProgress).await
    }

    /// Execute the use case with progress callbacks
    pub async fn execute_with_progress(
        &self,
        input: RunCouncilInput,
        progress: &dyn ProgressNotifier,
    ) -> Result<CouncilResult, RunCouncilError> {
        input.request.validate()?;

        let agents: BTreeSet<AgentId> = input.agents.iter().copied().collect();
        if agents.is_empty() {
            return Err(DomainError::NoAgents.into());
        }
        if agents.len() < self.params.min_responses {
            return Err(RunCouncilError::TooFewAgents {
                requested: agents.len(),
                required: self.params.min_responses,
            });
        }

        info!("Starting council with {} agents", agents.len());

        let timeout = self.params.request_timeout;
        let bounded = tokio::time::timeout(timeout, self.run_rounds(&agents, &input.request, progress));

        // Dropping `bounded` aborts every in-flight gather task and critique call.
        let outcome = match &self.cancellation_token {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => return Err(RunCouncilError::Cancelled),
                outcome = bounded => outcome,
            },
            None => bounded.await,
        };

        match outcome {
            Ok(result) => result,
            Err(_) => {
                warn!("Council timed out after {:?}", timeout);
                Err(RunCouncilError::Timeout(timeout))
            }
        }
    }

    async fn run_rounds(
        &self,
        agents: &BTreeSet<AgentId>,
        request: &AdvisoryRequest,
        progress: &dyn ProgressNotifier,
    ) -> Result<CouncilResult, RunCouncilError> {
        // Phase 1: Gather
        let survivors = self.phase_gather(agents, request, progress).await;
        if survivors.len() < self.params.min_responses {
            warn!(
                "Only {} of {} agents responded; council cannot proceed",
                survivors.len(),
                agents.len()
            );
            return Err(RunCouncilError::InsufficientResponses {
                required: self.params.min_responses,
                received: survivors.len(),
            });
        }
        let agents_used: Vec<AgentId> = survivors.iter().map(|r| r.agent).collect();
        let failed_agents: Vec<AgentId> = agents
            .iter()
            .filter(|agent| !agents_used.contains(agent))
            .copied()
            .collect();

        // Phase 2: Anonymize
        let responses = {
            let mut rng = rand::thread_rng();
            anonymize(survivors, &mut rng)
        };

        // Phase 3: Cross-critique
        let critiques = self
            .phase_critique(request.prompt(), &responses, progress)
            .await;
        if critiques.is_empty() {
            return Err(RunCouncilError::CritiquePhaseFailed);
        }

        // Phase 4: Score
        let board = Scoreboard::tally(&responses, &critiques);
        let seed = board
            .seed()
            .and_then(|score| responses.iter().position(|r| r.id == score.response_id))
            .ok_or(RunCouncilError::CritiquePhaseFailed)?;
        let consensus_score = board.consensus_score();
        debug!(
            "Seed {} (consensus {:.2})",
            responses[seed].agent, consensus_score
        );

        // Phase 5: Synthesize
        let (content, synthesized) = self
            .phase_synthesis(request.prompt(), &responses, seed, &critiques, progress)
            .await;

        let mut by_agent: Vec<&AgentResponse> = responses.iter().collect();
        by_agent.sort_by_key(|r| r.agent);
        let mut sources: Vec<String> = Vec::new();
        for source in by_agent.iter().flat_map(|r| r.sources.iter()) {
            if !sources.contains(source) {
                sources.push(source.clone());
            }
        }

        let result = CouncilResult {
            content,
            confidence: (consensus_score / 10.0).clamp(0.0, 1.0),
            sources,
            council_metadata: CouncilMetadata {
                agents_used,
                failed_agents,
                critique_count: critiques.len(),
                consensus_score,
                seed_agent: responses[seed].agent,
                synthesized,
            },
        };

        self.logger.log(CouncilEvent::new(
            "council_result",
            serde_json::to_value(&result).unwrap_or(serde_json::Value::Null),
        ));
        info!(
            "Council finished: {} critiques, consensus {:.2}",
            result.council_metadata.critique_count, consensus_score
        );
        Ok(result)
    }

    /// Phase 1: run every agent's pipeline in parallel
    async fn phase_gather(
        &self,
        agents: &BTreeSet<AgentId>,
        request: &AdvisoryRequest,
        progress: &dyn ProgressNotifier,
    ) -> Vec<AgentResponse> {
        info!("Phase 1: Gather");
        progress.on_phase_start(CouncilPhase::Gather, agents.len());

        let mut join_set = JoinSet::new();
        for &agent in agents {
            let runner = self.agent.clone();
            let input = RunAgentInput::new(agent, request.clone());
            join_set.spawn(async move { (agent, runner.execute(input).await) });
        }

        let mut survivors = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((agent, Ok(run))) => {
                    info!("{} responded", agent);
                    progress.on_task_complete(CouncilPhase::Gather, agent, true);
                    survivors.push(AgentResponse::from_output(run.final_output()));
                }
                Ok((agent, Err(e))) => {
                    warn!("{} produced no result: {}", agent, e);
                    progress.on_task_complete(CouncilPhase::Gather, agent, false);
                }
                Err(e) => {
                    warn!("Task join error: {}", e);
                }
            }
        }

        progress.on_phase_complete(CouncilPhase::Gather);
        survivors.sort_by_key(|r| r.agent);
        survivors
    }

    /// Phase 3: every agent critiques every other agent's response
    async fn phase_critique(
        &self,
        question: &str,
        responses: &[AgentResponse],
        progress: &dyn ProgressNotifier,
    ) -> Vec<Critique> {
        info!("Phase 3: Cross-critique");
        let assignments = critique_assignments(responses);
        progress.on_phase_start(CouncilPhase::Critique, assignments.len());

        let critiques: Vec<Critique> = stream::iter(assignments)
            .map(|assignment| self.critique_one(question, responses, assignment, progress))
            .buffer_unordered(self.params.critique_concurrency.max(1))
            .filter_map(future::ready)
            .collect()
            .await;

        progress.on_phase_complete(CouncilPhase::Critique);
        critiques
    }

    async fn critique_one(
        &self,
        question: &str,
        responses: &[AgentResponse],
        assignment: CritiqueAssignment,
        progress: &dyn ProgressNotifier,
    ) -> Option<Critique> {
        let target = &responses[assignment.target];
        let critic = assignment.critic;
        let options = InvokeOptions::new(
            self.params.critique_temperature,
            self.params.critique_max_tokens,
        );
        let prompt = PromptTemplate::critique_prompt(question, &label(assignment.target), &target.content);

        let critique = match self
            .invoker
            .invoke(&PromptTemplate::critique_system(critic), &prompt, &options)
            .await
        {
            Ok(invocation) => {
                let parsed = parse_critique(&invocation.text, target.id.clone(), critic);
                if parsed.is_none() {
                    warn!("{} returned an unparseable critique; dropping it", critic);
                }
                parsed
            }
            Err(e) => {
                warn!("{} critique call failed: {}", critic, e);
                None
            }
        };

        progress.on_task_complete(CouncilPhase::Critique, critic, critique.is_some());
        if let Some(critique) = &critique {
            self.logger.log(CouncilEvent::new(
                "critique",
                json!({
                    "critic": critique.critic,
                    "target": target.agent,
                    "response_id": critique.response_id,
                    "score": critique.score,
                    "feedback": critique.feedback,
                }),
            ));
        }
        critique
    }

    /// Phase 5: merge the seed with feedback and the other answers.
    ///
    /// Returns the text and whether synthesis succeeded.
    async fn phase_synthesis(
        &self,
        question: &str,
        responses: &[AgentResponse],
        seed: usize,
        critiques: &[Critique],
        progress: &dyn ProgressNotifier,
    ) -> (String, bool) {
        info!("Phase 5: Synthesis");
        progress.on_phase_start(CouncilPhase::Synthesis, 1);

        let seed_response = &responses[seed];
        let feedback: Vec<String> = critiques
            .iter()
            .filter(|c| c.response_id == seed_response.id)
            .map(|c| format!("({}/10) {}", c.score, c.feedback))
            .collect();
        let excerpts: Vec<(String, String)> = responses
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != seed)
            .map(|(i, r)| (label(i), r.content.clone()))
            .collect();

        let prompt = PromptTemplate::synthesis_prompt(
            question,
            &seed_response.content,
            &feedback,
            &excerpts,
            self.params.excerpt_chars,
        );
        let options = InvokeOptions::new(
            self.params.synthesis_temperature,
            self.params.synthesis_max_tokens,
        );

        let outcome = match self
            .invoker
            .invoke(PromptTemplate::synthesis_system(), &prompt, &options)
            .await
        {
            Ok(invocation) if !invocation.text.trim().is_empty() => {
                (invocation.text.trim().to_string(), true)
            }
            Ok(_) => {
                warn!("Synthesis returned no text; using seed response");
                (seed_response.content.clone(), false)
            }
            Err(e) => {
                warn!("Synthesis failed ({}); using seed response", e);
                (seed_response.content.clone(), false)
            }
        };

        progress.on_task_complete(CouncilPhase::Synthesis, seed_response.agent, outcome.1);
        progress.on_phase_complete(CouncilPhase::Synthesis);
        self.logger.log(CouncilEvent::new(
            "synthesis",
            json!({
                "seed_agent": seed_response.agent,
                "synthesized": outcome.1,
                "content": outcome.0,
            }),
        ));
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineParams;
    use crate::ports::model_backend::BackendError;
    use crate::use_cases::test_support::{
        CallKind, ScriptedBackend, StaticRetrieval, default_answer, harness,
    };
    use council_domain::DomainMetadata;
    use std::sync::Mutex;

    fn request() -> AdvisoryRequest {
        AdvisoryRequest::new(
            "What market size for vertical SaaS in healthtech?",
            DomainMetadata::new("finance", "healthtech"),
        )
    }

    fn council(backend: Arc<ScriptedBackend>, params: CouncilParams) -> RunCouncilUseCase {
        let h = harness(backend, StaticRetrieval::hit());
        let agent = RunAgentUseCase::new(h.context, h.invoker.clone(), PipelineParams::default());
        RunCouncilUseCase::new(agent, h.invoker, params)
    }

    #[derive(Default)]
    struct RecordingProgress {
        events: Mutex<Vec<String>>,
    }

    impl ProgressNotifier for RecordingProgress {
        fn on_phase_start(&self, phase: CouncilPhase, total_tasks: usize) {
            self.events.lock().unwrap().push(format!("start:{}:{}", phase, total_tasks));
        }
        fn on_task_complete(&self, _phase: CouncilPhase, _agent: AgentId, _success: bool) {}
        fn on_phase_complete(&self, phase: CouncilPhase) {
            self.events.lock().unwrap().push(format!("done:{}", phase));
        }
    }

    #[derive(Default)]
    struct RecordingLogger {
        events: Mutex<Vec<&'static str>>,
    }

    impl CouncilLogger for RecordingLogger {
        fn log(&self, event: CouncilEvent) {
            self.events.lock().unwrap().push(event.event_type);
        }
    }

    #[tokio::test]
    async fn test_two_agents_full_council() {
        let backend = ScriptedBackend::healthy();
        let progress = RecordingProgress::default();
        let result = council(backend.clone(), CouncilParams::default())
            .execute_with_progress(
                RunCouncilInput::new([AgentId::Legal, AgentId::Finance], request()),
                &progress,
            )
            .await
            .unwrap();

        assert_eq!(result.content, "- combined answer");
        assert_eq!(result.sources, vec!["market.pdf#3".to_string()]);
        assert!((result.confidence - 0.7).abs() < 1e-9);

        let metadata = &result.council_metadata;
        assert_eq!(metadata.agents_used, vec![AgentId::Legal, AgentId::Finance]);
        assert!(metadata.failed_agents.is_empty());
        assert_eq!(metadata.critique_count, 2);
        assert!((metadata.consensus_score - 7.0).abs() < 1e-9);
        assert!(metadata.synthesized);

        assert_eq!(
            *progress.events.lock().unwrap(),
            vec![
                "start:gather:2",
                "done:gather",
                "start:critique:2",
                "done:critique",
                "start:synthesis:1",
                "done:synthesis",
            ]
        );
        assert_eq!(backend.count(CallKind::Synthesis), 1);
    }

    #[tokio::test]
    async fn test_one_failed_agent_is_insufficient() {
        let backend = ScriptedBackend::new(|call| match (call.kind, call.agent) {
            (CallKind::Draft, Some(AgentId::Legal)) => {
                Err(BackendError::Transport("legal backend down".into()))
            }
            _ => default_answer(call),
        });
        let result = council(backend.clone(), CouncilParams::default())
            .execute(RunCouncilInput::new([AgentId::Legal, AgentId::Finance], request()))
            .await;

        assert_eq!(
            result,
            Err(RunCouncilError::InsufficientResponses {
                required: 2,
                received: 1
            })
        );
        assert_eq!(backend.count(CallKind::Critique), 0);
        assert_eq!(backend.count(CallKind::Synthesis), 0);
    }

    #[tokio::test]
    async fn test_failed_agent_tolerated_with_enough_survivors() {
        let backend = ScriptedBackend::new(|call| match (call.kind, call.agent) {
            (CallKind::Draft, Some(AgentId::Competitor)) => {
                Err(BackendError::Transport("down".into()))
            }
            _ => default_answer(call),
        });
        let result = council(backend, CouncilParams::default())
            .execute(RunCouncilInput::new(
                [AgentId::Legal, AgentId::Finance, AgentId::Competitor],
                request(),
            ))
            .await
            .unwrap();

        assert_eq!(result.council_metadata.failed_agents, vec![AgentId::Competitor]);
        assert_eq!(result.council_metadata.agents_used.len(), 2);
        assert_eq!(result.council_metadata.critique_count, 2);
    }

    #[tokio::test]
    async fn test_synthesis_failure_returns_seed_verbatim() {
        let backend = ScriptedBackend::new(|call| match call.kind {
            CallKind::Critique if call.user.contains("finance draft answer") => {
                Ok(r#"{"score": 9, "feedback": "strong"}"#.into())
            }
            CallKind::Critique => Ok(r#"{"score": 4, "feedback": "thin"}"#.into()),
            CallKind::Synthesis => Err(BackendError::Status {
                status: 500,
                body: "boom".into(),
            }),
            _ => default_answer(call),
        });
        let result = council(backend, CouncilParams::default())
            .execute(RunCouncilInput::new(
                [AgentId::Legal, AgentId::Finance, AgentId::Investor],
                request(),
            ))
            .await
            .unwrap();

        assert_eq!(result.content, "finance draft answer");
        assert_eq!(result.council_metadata.seed_agent, AgentId::Finance);
        assert!(!result.council_metadata.synthesized);
        // finance 9, legal 4, investor 4
        assert!((result.council_metadata.consensus_score - 17.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unparseable_critiques_fail_phase() {
        let backend = ScriptedBackend::new(|call| match call.kind {
            CallKind::Critique => Ok("Looks fine to me.".into()),
            _ => default_answer(call),
        });
        let result = council(backend.clone(), CouncilParams::default())
            .execute(RunCouncilInput::new([AgentId::Legal, AgentId::Finance], request()))
            .await;

        assert_eq!(result, Err(RunCouncilError::CritiquePhaseFailed));
        assert_eq!(backend.count(CallKind::Synthesis), 0);
    }

    #[tokio::test]
    async fn test_partial_critique_failure_tolerated() {
        let backend = ScriptedBackend::new(|call| match (call.kind, call.agent) {
            (CallKind::Critique, Some(AgentId::Legal)) => Ok("not json".into()),
            _ => default_answer(call),
        });
        let result = council(backend, CouncilParams::default())
            .execute(RunCouncilInput::new(
                [AgentId::Legal, AgentId::Finance, AgentId::Investor],
                request(),
            ))
            .await
            .unwrap();

        // 6 pairs, the legal critic's 2 dropped
        assert_eq!(result.council_metadata.critique_count, 4);
    }

    #[tokio::test]
    async fn test_no_self_critique_in_cross_round() {
        let backend = ScriptedBackend::healthy();
        council(backend.clone(), CouncilParams::default())
            .execute(RunCouncilInput::new(AgentId::all(), request()))
            .await
            .unwrap();

        let critiques: Vec<_> = backend
            .calls()
            .into_iter()
            .filter(|c| c.kind == CallKind::Critique)
            .collect();
        assert_eq!(critiques.len(), 12);
        for call in critiques {
            let critic = call.agent.unwrap();
            assert!(!call.user.contains(&format!("{} draft answer", critic.as_str())));
        }
    }

    #[tokio::test]
    async fn test_critique_concurrency_is_capped() {
        let backend = ScriptedBackend::slow(Duration::from_millis(20));
        council(
            backend.clone(),
            CouncilParams::default().with_critique_concurrency(2),
        )
        .execute(RunCouncilInput::new(AgentId::all(), request()))
        .await
        .unwrap();

        assert!(backend.critique_peak() <= 2);
        assert!(backend.critique_peak() >= 1);
    }

    #[tokio::test]
    async fn test_too_few_agents() {
        let backend = ScriptedBackend::healthy();
        let result = council(backend.clone(), CouncilParams::default())
            .execute(RunCouncilInput::new([AgentId::Legal, AgentId::Legal], request()))
            .await;

        assert_eq!(
            result,
            Err(RunCouncilError::TooFewAgents {
                requested: 1,
                required: 2
            })
        );
        assert!(backend.calls().is_empty());

        let empty = council(ScriptedBackend::healthy(), CouncilParams::default())
            .execute(RunCouncilInput::new(Vec::new(), request()))
            .await;
        assert_eq!(empty, Err(RunCouncilError::InvalidRequest(DomainError::NoAgents)));
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let backend = ScriptedBackend::slow(Duration::from_millis(200));
        let result = council(
            backend,
            CouncilParams::default().with_request_timeout(Duration::from_millis(50)),
        )
        .execute(RunCouncilInput::new([AgentId::Legal, AgentId::Finance], request()))
        .await;

        assert_eq!(result, Err(RunCouncilError::Timeout(Duration::from_millis(50))));
    }

    #[tokio::test]
    async fn test_cancellation() {
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let result = council(ScriptedBackend::slow(Duration::from_millis(200)), CouncilParams::default())
            .with_cancellation(token)
            .execute(RunCouncilInput::new([AgentId::Legal, AgentId::Finance], request()))
            .await;
        assert!(result.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_transcript_events() {
        let logger = Arc::new(RecordingLogger::default());
        council(ScriptedBackend::healthy(), CouncilParams::default())
            .with_logger(logger.clone())
            .execute(RunCouncilInput::new([AgentId::Legal, AgentId::Finance], request()))
            .await
            .unwrap();

        let events = logger.events.lock().unwrap().clone();
        assert_eq!(events.iter().filter(|e| **e == "critique").count(), 2);
        assert_eq!(events.last(), Some(&"council_result"));
        assert!(events.contains(&"synthesis"));
    }
}
