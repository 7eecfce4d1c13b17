//! Run Agent use case
//!
//! Runs one advisor through its pipeline:
//! 1. Context - cache-first retrieval scoped to the agent's domain
//! 2. Draft - model call with the agent persona and retrieved context
//! 3. Self-critique (optional) - the agent grades its own draft
//! 4. Refine - rewrite the draft when the self-critique score is low
//!
//! Exactly one output of every run carries [`Phase::Final`]. Degraded
//! context never fails the run; a failed draft does.

use crate::config::PipelineParams;
use crate::ports::council_logger::{CouncilEvent, CouncilLogger, NoCouncilLogger};
use crate::ports::model_backend::BackendKind;
use crate::services::context_provider::{ContextFetch, ContextProvider};
use crate::services::model_invoker::{GROUNDED_CONFIDENCE, InvokeError, InvokeOptions, ModelInvoker};
use council_domain::{
    AdvisoryRequest, AgentId, AgentOutput, AgentRun, ContextQuery, DomainError, OutputMetadata,
    Phase, PromptTemplate, ResponseId, parse_critique,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors that can occur during a single-agent run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RunAgentError {
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] DomainError),

    #[error("No model backend available for {0}")]
    NoModelAvailable(AgentId),

    #[error("Model call failed for {agent}: {message}")]
    ModelFailed { agent: AgentId, message: String },

    #[error("{0} produced an empty draft")]
    EmptyResponse(AgentId),

    #[error("Agent request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Operation cancelled")]
    Cancelled,
}

impl RunAgentError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunAgentError::Cancelled)
    }

    /// No backend could be reached; retrying immediately is pointless
    pub fn is_no_model_available(&self) -> bool {
        matches!(self, RunAgentError::NoModelAvailable(_))
    }

    fn from_invoke(agent: AgentId, error: InvokeError) -> Self {
        match error {
            InvokeError::NoModelAvailable => RunAgentError::NoModelAvailable(agent),
            other => RunAgentError::ModelFailed {
                agent,
                message: other.to_string(),
            },
        }
    }
}

/// Input for the RunAgent use case
#[derive(Debug, Clone)]
pub struct RunAgentInput {
    pub agent: AgentId,
    pub request: AdvisoryRequest,
    /// Backend to try first
    pub backend: Option<BackendKind>,
}

impl RunAgentInput {
    pub fn new(agent: AgentId, request: AdvisoryRequest) -> Self {
        Self {
            agent,
            request,
            backend: None,
        }
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = Some(backend);
        self
    }
}

/// Use case for running one advisory agent
#[derive(Clone)]
pub struct RunAgentUseCase {
    context: Arc<ContextProvider>,
    invoker: Arc<ModelInvoker>,
    params: PipelineParams,
    logger: Arc<dyn CouncilLogger>,
    cancellation_token: Option<CancellationToken>,
}

impl RunAgentUseCase {
    pub fn new(context: Arc<ContextProvider>, invoker: Arc<ModelInvoker>, params: PipelineParams) -> Self {
        Self {
            context,
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

    pub fn params(&self) -> &PipelineParams {
        &self.params
    }

    /// Validate, then run the pipeline under the request timeout
    pub async fn execute(&self, input: RunAgentInput) -> Result<AgentRun, RunAgentError> {
        input.request.validate()?;

        let timeout = self.params.request_timeout;
        let bounded = tokio::time::timeout(timeout, self.run_pipeline(&input));

        let outcome = match &self.cancellation_token {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => return Err(RunAgentError::Cancelled),
                outcome = bounded => outcome,
            },
            None => bounded.await,
        };

        match outcome {
            Ok(result) => result,
            Err(_) => {
                warn!("{} timed out after {:?}", input.agent, timeout);
                Err(RunAgentError::Timeout(timeout))
            }
        }
    }

    async fn run_pipeline(&self, input: &RunAgentInput) -> Result<AgentRun, RunAgentError> {
        let agent = input.agent;
        let request = &input.request;
        info!("Running {} agent", agent);

        let query = ContextQuery::for_agent(agent, request).with_limit(self.params.retrieval_limit);
        let context = self.context.fetch(&query).await;
        debug!(
            "{} context: {} ({} chunks)",
            agent,
            context.origin.as_str(),
            context.result.chunks_found
        );

        let system = PromptTemplate::agent_system(agent);
        let draft = self.draft(input, &system, &context).await?;
        self.log_output(&draft);

        let (intermediate, final_output) = if self.params.self_critique {
            self.self_critique(input, &system, draft).await
        } else {
            (vec![draft.clone()], draft)
        };

        for output in intermediate.iter().skip(1) {
            self.log_output(output);
        }
        let run = AgentRun::new(agent, intermediate, final_output);
        self.log_output(run.final_output());
        Ok(run)
    }

    async fn draft(
        &self,
        input: &RunAgentInput,
        system: &str,
        context: &ContextFetch,
    ) -> Result<AgentOutput, RunAgentError> {
        let agent = input.agent;
        let prompt = PromptTemplate::draft_prompt(
            input.request.prompt(),
            &context.result.text,
            input.request.attachments(),
        );
        let options = InvokeOptions::new(self.params.draft_temperature, self.params.draft_max_tokens)
            .with_preferred(input.backend);

        let invocation = self
            .invoker
            .invoke(system, &prompt, &options)
            .await
            .map_err(|e| RunAgentError::from_invoke(agent, e))?;

        if invocation.text.trim().is_empty() {
            return Err(RunAgentError::EmptyResponse(agent));
        }

        let grounded = context.result.chunks_found > 0;
        let confidence = if grounded {
            invocation.confidence.max(GROUNDED_CONFIDENCE)
        } else {
            invocation.confidence
        };

        let mut sources: Vec<String> = Vec::new();
        for source in context.result.source_labels().into_iter().chain(invocation.sources) {
            if !sources.contains(&source) {
                sources.push(source);
            }
        }

        let mut metadata = OutputMetadata::new(context.origin, context.result.chunks_found);
        metadata.backends = invocation.backends.iter().map(|b| b.to_string()).collect();

        Ok(AgentOutput::new(
            agent,
            Phase::Draft,
            invocation.text.trim(),
            confidence,
            sources,
            metadata,
        ))
    }

    /// Grade the draft and refine it when the grade is low.
    ///
    /// Any failure here leaves the draft as the final answer.
    async fn self_critique(
        &self,
        input: &RunAgentInput,
        system: &str,
        draft: AgentOutput,
    ) -> (Vec<AgentOutput>, AgentOutput) {
        let agent = input.agent;
        let question = input.request.prompt();
        let options = InvokeOptions::new(
            self.params.self_critique_temperature,
            self.params.self_critique_max_tokens,
        )
        .with_preferred(input.backend);

        let raw = match self
            .invoker
            .invoke(system, &PromptTemplate::self_critique_prompt(question, &draft.content), &options)
            .await
        {
            Ok(invocation) => invocation.text,
            Err(e) => {
                warn!("{} self-critique failed: {}", agent, e);
                return (vec![draft.clone()], draft);
            }
        };

        let Some(critique) = parse_critique(&raw, ResponseId::from(agent.as_str()), agent) else {
            warn!("{} self-critique was not parseable; keeping draft", agent);
            return (vec![draft.clone()], draft);
        };
        debug!("{} self-critique score {}", agent, critique.score);

        let mut critique_metadata = draft.metadata.clone();
        critique_metadata.self_critique_score = Some(critique.score);
        let critique_output = AgentOutput::new(
            agent,
            Phase::Critique,
            critique.feedback.clone(),
            f64::from(critique.score) / 10.0,
            Vec::new(),
            critique_metadata.clone(),
        );

        let mut final_output = draft.as_phase(Phase::Final);
        final_output.metadata = critique_metadata;

        if critique.score < self.params.refine_below {
            let refine_options = InvokeOptions::new(
                self.params.draft_temperature,
                self.params.draft_max_tokens,
            )
            .with_preferred(input.backend);
            let prompt = PromptTemplate::refine_prompt(question, &draft.content, &critique.feedback);

            match self.invoker.invoke(system, &prompt, &refine_options).await {
                Ok(refined) if !refined.text.trim().is_empty() => {
                    final_output.content = refined.text.trim().to_string();
                    final_output.metadata.refined = true;
                }
                Ok(_) => warn!("{} refinement was empty; keeping draft", agent),
                Err(e) => warn!("{} refinement failed: {}", agent, e),
            }
        }

        (vec![draft, critique_output], final_output)
    }

    fn log_output(&self, output: &AgentOutput) {
        let payload = serde_json::to_value(output).unwrap_or(serde_json::Value::Null);
        self.logger.log(CouncilEvent::new("agent_output", payload));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::model_backend::BackendError;
    use crate::use_cases::test_support::{
        CallKind, ScriptedBackend, StaticRetrieval, default_answer, harness,
    };
    use council_domain::{ContextOrigin, DomainMetadata};
    use std::sync::atomic::Ordering;

    fn request() -> AdvisoryRequest {
        AdvisoryRequest::new(
            "What market size for vertical SaaS in healthtech?",
            DomainMetadata::new("finance", "healthtech").with_region("EU"),
        )
    }

    fn use_case(backend: Arc<ScriptedBackend>, retrieval: Arc<StaticRetrieval>) -> RunAgentUseCase {
        let h = harness(backend, retrieval);
        RunAgentUseCase::new(h.context, h.invoker, PipelineParams::default())
    }

    #[test]
    fn test_run_agent_error_cancelled() {
        let error = RunAgentError::Cancelled;
        assert_eq!(error.to_string(), "Operation cancelled");
        assert!(error.is_cancelled());
        assert!(!RunAgentError::EmptyResponse(AgentId::Legal).is_cancelled());
    }

    #[tokio::test]
    async fn test_draft_stands_when_score_high() {
        let backend = ScriptedBackend::healthy();
        let run = use_case(backend.clone(), StaticRetrieval::hit())
            .execute(RunAgentInput::new(AgentId::Finance, request()))
            .await
            .unwrap();

        let phases: Vec<Phase> = run.outputs().iter().map(|o| o.phase).collect();
        assert_eq!(phases, vec![Phase::Draft, Phase::Critique, Phase::Final]);

        let final_output = run.final_output();
        assert_eq!(final_output.content, "finance draft answer");
        assert_eq!(final_output.metadata.self_critique_score, Some(9));
        assert!(!final_output.metadata.refined);
        assert_eq!(final_output.metadata.context_origin, ContextOrigin::Live);
        assert_eq!(final_output.sources, vec!["market.pdf#3".to_string()]);
        assert!(final_output.confidence >= GROUNDED_CONFIDENCE);
        assert_eq!(backend.count(CallKind::Refine), 0);
    }

    #[tokio::test]
    async fn test_low_score_refines() {
        let backend = ScriptedBackend::new(|call| match call.kind {
            CallKind::SelfCritique => Ok(r#"{"score": 5, "feedback": "Cite TAM numbers"}"#.into()),
            _ => default_answer(call),
        });
        let run = use_case(backend.clone(), StaticRetrieval::hit())
            .execute(RunAgentInput::new(AgentId::Investor, request()))
            .await
            .unwrap();

        assert_eq!(run.final_output().content, "investor refined answer");
        assert!(run.final_output().metadata.refined);
        assert_eq!(run.output(Phase::Draft).unwrap().content, "investor draft answer");
        assert_eq!(run.output(Phase::Critique).unwrap().content, "Cite TAM numbers");

        let refine = backend
            .calls()
            .into_iter()
            .find(|c| c.kind == CallKind::Refine)
            .unwrap();
        assert!(refine.user.contains("Cite TAM numbers"));
    }

    #[tokio::test]
    async fn test_unparseable_self_critique_keeps_draft() {
        let backend = ScriptedBackend::new(|call| match call.kind {
            CallKind::SelfCritique => Ok("I think it is pretty good".into()),
            _ => default_answer(call),
        });
        let run = use_case(backend, StaticRetrieval::hit())
            .execute(RunAgentInput::new(AgentId::Legal, request()))
            .await
            .unwrap();

        assert_eq!(run.outputs().len(), 2);
        assert_eq!(run.final_output().content, "legal draft answer");
        assert!(run.output(Phase::Critique).is_none());
    }

    #[tokio::test]
    async fn test_failed_refinement_keeps_draft() {
        let backend = ScriptedBackend::new(|call| match call.kind {
            CallKind::SelfCritique => Ok(r#"{"score": 3, "feedback": "weak"}"#.into()),
            CallKind::Refine => Err(BackendError::Transport("reset".into())),
            _ => default_answer(call),
        });
        let run = use_case(backend, StaticRetrieval::hit())
            .execute(RunAgentInput::new(AgentId::Competitor, request()))
            .await
            .unwrap();

        assert_eq!(run.final_output().content, "competitor draft answer");
        assert!(!run.final_output().metadata.refined);
    }

    #[tokio::test]
    async fn test_without_self_critique() {
        let backend = ScriptedBackend::healthy();
        let h = harness(backend.clone(), StaticRetrieval::hit());
        let use_case = RunAgentUseCase::new(
            h.context,
            h.invoker,
            PipelineParams::default().with_self_critique(false),
        );
        let run = use_case
            .execute(RunAgentInput::new(AgentId::Finance, request()))
            .await
            .unwrap();

        assert_eq!(run.outputs().len(), 2);
        assert_eq!(run.final_output().phase, Phase::Final);
        assert_eq!(backend.count(CallKind::SelfCritique), 0);
    }

    #[tokio::test]
    async fn test_degraded_context_is_absorbed() {
        let retrieval = StaticRetrieval::down();
        let run = use_case(ScriptedBackend::healthy(), retrieval.clone())
            .execute(RunAgentInput::new(AgentId::Legal, request()))
            .await
            .unwrap();

        let final_output = run.final_output();
        assert_eq!(final_output.metadata.context_origin, ContextOrigin::Unavailable);
        assert!(final_output.sources.is_empty());
        assert!(final_output.confidence < GROUNDED_CONFIDENCE);
        assert_eq!(retrieval.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_draft_failure_fails_agent() {
        let backend = ScriptedBackend::new(|call| match call.kind {
            CallKind::Draft => Err(BackendError::Status {
                status: 503,
                body: "overloaded".into(),
            }),
            _ => default_answer(call),
        });
        let result = use_case(backend, StaticRetrieval::hit())
            .execute(RunAgentInput::new(AgentId::Finance, request()))
            .await;
        assert!(matches!(
            result,
            Err(RunAgentError::ModelFailed {
                agent: AgentId::Finance,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_empty_draft() {
        let backend = ScriptedBackend::new(|call| match call.kind {
            CallKind::Draft => Ok("   ".into()),
            _ => default_answer(call),
        });
        let result = use_case(backend, StaticRetrieval::hit())
            .execute(RunAgentInput::new(AgentId::Finance, request()))
            .await;
        assert_eq!(result, Err(RunAgentError::EmptyResponse(AgentId::Finance)));
    }

    #[tokio::test]
    async fn test_invalid_request_rejected_before_calls() {
        let backend = ScriptedBackend::healthy();
        let retrieval = StaticRetrieval::hit();
        let bad = AdvisoryRequest::new("  ", DomainMetadata::new("finance", "healthtech"));
        let result = use_case(backend.clone(), retrieval.clone())
            .execute(RunAgentInput::new(AgentId::Finance, bad))
            .await;

        assert_eq!(result, Err(RunAgentError::InvalidRequest(DomainError::EmptyPrompt)));
        assert!(backend.calls().is_empty());
        assert_eq!(retrieval.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let result = use_case(ScriptedBackend::healthy(), StaticRetrieval::hit())
            .with_cancellation(token)
            .execute(RunAgentInput::new(AgentId::Finance, request()))
            .await;
        assert_eq!(result, Err(RunAgentError::Cancelled));
    }
}
