//! Application layer for startup-council
//!
//! This crate contains use cases, services, port definitions, and
//! application configuration. It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod services;
pub mod use_cases;

// Re-export commonly used types
pub use config::{CacheSettings, CouncilParams, PipelineParams};
pub use ports::{
    clock::{Clock, ManualClock, SystemClock},
    council_logger::{CouncilEvent, CouncilLogger, NoCouncilLogger},
    model_backend::{BackendError, BackendKind, Generation, GenerationOptions, ModelBackend},
    progress::{CouncilPhase, NoProgress, ProgressNotifier},
    retrieval::{RetrievalError, RetrievalPort},
};
pub use services::{
    circuit_breaker::{CallFailure, CircuitBreakerRegistry},
    context_cache::ContextCache,
    context_provider::{ContextFetch, ContextProvider},
    model_invoker::{BackendRegistry, InvokeError, InvokeOptions, Invocation, ModelInvoker},
};
pub use use_cases::advisory::AdvisoryService;
pub use use_cases::run_agent::{RunAgentError, RunAgentInput, RunAgentUseCase};
pub use use_cases::run_council::{RunCouncilError, RunCouncilInput, RunCouncilUseCase};
