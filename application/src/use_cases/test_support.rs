//! Scripted adapters shared by the use case tests.

use crate::config::CacheSettings;
use crate::ports::clock::ManualClock;
use crate::ports::model_backend::{
    BackendError, BackendKind, Generation, GenerationOptions, ModelBackend,
};
use crate::ports::retrieval::{RetrievalError, RetrievalPort};
use crate::services::circuit_breaker::CircuitBreakerRegistry;
use crate::services::context_cache::ContextCache;
use crate::services::context_provider::ContextProvider;
use crate::services::model_invoker::{BackendRegistry, ModelInvoker};
use async_trait::async_trait;
use council_domain::{AgentId, BreakerPolicy, ContextQuery, ContextResult, SourceRef};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Which prompt a backend call carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallKind {
    Draft,
    SelfCritique,
    Refine,
    Critique,
    Synthesis,
}

#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub kind: CallKind,
    /// Author of a draft/self-critique/refine call, or the critic
    pub agent: Option<AgentId>,
    pub user: String,
}

impl Call {
    fn classify(system: &str, user: &str) -> Self {
        let agent = AgentId::all()
            .into_iter()
            .find(|agent| system.contains(agent.role()));
        let kind = if system.starts_with("You are the chair") {
            CallKind::Synthesis
        } else if system.contains("reviewing another advisor") {
            CallKind::Critique
        } else if user.contains("Grade the draft") {
            CallKind::SelfCritique
        } else if user.contains("Rewrite the answer") {
            CallKind::Refine
        } else {
            CallKind::Draft
        };
        Self {
            kind,
            agent,
            user: user.to_string(),
        }
    }
}

type Responder = dyn Fn(&Call) -> Result<String, BackendError> + Send + Sync;

/// Backend whose answers are computed from the classified call
pub(crate) struct ScriptedBackend {
    responder: Box<Responder>,
    calls: Mutex<Vec<Call>>,
    delay: Option<Duration>,
    critiques_in_flight: AtomicUsize,
    critique_peak: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(
        responder: impl Fn(&Call) -> Result<String, BackendError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self::build(responder, None))
    }

    /// Every call sleeps for `delay` before answering
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self::build(default_answer, Some(delay)))
    }

    /// Every phase succeeds; critiques score 7
    pub fn healthy() -> Arc<Self> {
        Self::new(default_answer)
    }

    fn build(
        responder: impl Fn(&Call) -> Result<String, BackendError> + Send + Sync + 'static,
        delay: Option<Duration>,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
            delay,
            critiques_in_flight: AtomicUsize::new(0),
            critique_peak: AtomicUsize::new(0),
        }
    }

    /// Most critique calls observed running at once
    pub fn critique_peak(&self) -> usize {
        self.critique_peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, kind: CallKind) -> usize {
        self.calls().iter().filter(|c| c.kind == kind).count()
    }
}

/// Default answer for each call kind
pub(crate) fn default_answer(call: &Call) -> Result<String, BackendError> {
    let agent = call.agent.map(|a| a.as_str()).unwrap_or("unknown");
    Ok(match call.kind {
        CallKind::Draft => format!("{} draft answer", agent),
        CallKind::SelfCritique => r#"{"score": 9, "feedback": "Good enough"}"#.to_string(),
        CallKind::Refine => format!("{} refined answer", agent),
        CallKind::Critique => r#"{"score": 7, "feedback": "Reasonable"}"#.to_string(),
        CallKind::Synthesis => "- combined answer".to_string(),
    })
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Gemini
    }

    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<Generation, BackendError> {
        let call = Call::classify(system_prompt, user_prompt);
        self.calls.lock().unwrap().push(call.clone());

        let is_critique = call.kind == CallKind::Critique;
        if is_critique {
            let now = self.critiques_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.critique_peak.fetch_max(now, Ordering::SeqCst);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if is_critique {
            self.critiques_in_flight.fetch_sub(1, Ordering::SeqCst);
        }

        (self.responder)(&call).map(Generation::new)
    }
}

/// Retrieval port that always returns the same result
pub(crate) struct StaticRetrieval {
    result: Result<ContextResult, RetrievalError>,
    pub calls: AtomicUsize,
}

impl StaticRetrieval {
    pub fn hit() -> Arc<Self> {
        Arc::new(Self {
            result: Ok(ContextResult::new(
                "Healthtech SaaS spend reached $12B in 2024.",
                vec![SourceRef::new("f1", "market.pdf", 0.91, 3)],
            )),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn down() -> Arc<Self> {
        Arc::new(Self {
            result: Err(RetrievalError::Transport("connection refused".into())),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl RetrievalPort for StaticRetrieval {
    async fn query(&self, _query: &ContextQuery) -> Result<ContextResult, RetrievalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Services wired over scripted adapters
pub(crate) struct Harness {
    pub context: Arc<ContextProvider>,
    pub invoker: Arc<ModelInvoker>,
    pub breakers: Arc<CircuitBreakerRegistry>,
}

pub(crate) fn harness(backend: Arc<ScriptedBackend>, retrieval: Arc<StaticRetrieval>) -> Harness {
    let clock = Arc::new(ManualClock::new());
    // Scripted failures must not trip the shared model circuit
    let policy = BreakerPolicy {
        failure_threshold: 1000,
        ..BreakerPolicy::default()
    };
    let breakers = Arc::new(CircuitBreakerRegistry::new(policy, clock.clone()));
    let cache = Arc::new(ContextCache::new(CacheSettings::default(), clock));
    let context = Arc::new(ContextProvider::new(
        retrieval,
        cache,
        breakers.clone(),
        Duration::from_secs(1),
    ));
    let registry = BackendRegistry::new(BackendKind::Gemini).with_backend(backend);
    let invoker = Arc::new(ModelInvoker::new(
        Arc::new(registry),
        breakers.clone(),
        Duration::from_secs(1),
    ));
    Harness {
        context,
        invoker,
        breakers,
    }
}
