//! Advisory service
//!
//! The two operations exposed to callers: run one advisor, or run a
//! council of advisors. Both share one context provider, one model
//! invoker and one circuit breaker registry per process.

use crate::config::{CouncilParams, PipelineParams};
use crate::ports::council_logger::{CouncilLogger, NoCouncilLogger};
use crate::ports::model_backend::BackendKind;
use crate::ports::progress::{NoProgress, ProgressNotifier};
use crate::services::circuit_breaker::CircuitBreakerRegistry;
use crate::services::context_provider::ContextProvider;
use crate::services::model_invoker::ModelInvoker;
use crate::use_cases::run_agent::{RunAgentError, RunAgentInput, RunAgentUseCase};
use crate::use_cases::run_council::{RunCouncilError, RunCouncilInput, RunCouncilUseCase};
use council_domain::{AdvisoryRequest, AgentId, AgentOutput, CircuitState, CouncilResult};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct AdvisoryService {
    context: Arc<ContextProvider>,
    invoker: Arc<ModelInvoker>,
    breakers: Arc<CircuitBreakerRegistry>,
    pipeline: PipelineParams,
    council: CouncilParams,
    logger: Arc<dyn CouncilLogger>,
    cancellation_token: Option<CancellationToken>,
}

impl AdvisoryService {
    pub fn new(
        context: Arc<ContextProvider>,
        invoker: Arc<ModelInvoker>,
        breakers: Arc<CircuitBreakerRegistry>,
        pipeline: PipelineParams,
        council: CouncilParams,
    ) -> Self {
        Self {
            context,
            invoker,
            breakers,
            pipeline,
            council,
            logger: Arc::new(NoCouncilLogger),
            cancellation_token: None,
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn CouncilLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Set a cancellation token shared by every run started from this service
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub fn breakers(&self) -> &CircuitBreakerRegistry {
        &self.breakers
    }

    /// Current state of every circuit that has seen traffic
    pub fn circuit_snapshot(&self) -> Vec<(String, CircuitState)> {
        self.breakers.snapshot()
    }

    fn agent_use_case(&self) -> RunAgentUseCase {
        let use_case = RunAgentUseCase::new(
            self.context.clone(),
            self.invoker.clone(),
            self.pipeline.clone(),
        )
        .with_logger(self.logger.clone());
        match &self.cancellation_token {
            Some(token) => use_case.with_cancellation(token.clone()),
            None => use_case,
        }
    }

    /// Run one advisor and return its final output
    pub async fn run_single_agent(
        &self,
        agent: AgentId,
        request: AdvisoryRequest,
    ) -> Result<AgentOutput, RunAgentError> {
        self.run_single_agent_on(agent, request, None).await
    }

    /// Run one advisor, trying `backend` before the configured primary
    pub async fn run_single_agent_on(
        &self,
        agent: AgentId,
        request: AdvisoryRequest,
        backend: Option<BackendKind>,
    ) -> Result<AgentOutput, RunAgentError> {
        let mut input = RunAgentInput::new(agent, request);
        if let Some(kind) = backend {
            input = input.with_backend(kind);
        }
        let run = self.agent_use_case().execute(input).await?;
        Ok(run.into_final())
    }

    /// Run a council over `agents`, or over the request's own agent set
    /// when `agents` is empty
    pub async fn run_council(
        &self,
        agents: impl IntoIterator<Item = AgentId>,
        request: AdvisoryRequest,
    ) -> Result<CouncilResult, RunCouncilError> {
        self.run_council_with_progress(agents, request, &NoProgress)
            .await
    }

    pub async fn run_council_with_progress(
        &self,
        agents: impl IntoIterator<Item = AgentId>,
        request: AdvisoryRequest,
        progress: &dyn ProgressNotifier,
    ) -> Result<CouncilResult, RunCouncilError> {
        let mut agents: Vec<AgentId> = agents.into_iter().collect();
        if agents.is_empty() {
            agents.extend(request.agents().iter().copied());
        }
        let use_case = RunCouncilUseCase::new(
            self.agent_use_case(),
            self.invoker.clone(),
            self.council.clone(),
        )
        .with_logger(self.logger.clone());
        let use_case = match &self.cancellation_token {
            Some(token) => use_case.with_cancellation(token.clone()),
            None => use_case,
        };
        use_case
            .execute_with_progress(RunCouncilInput::new(agents, request), progress)
            .await
    }
}
