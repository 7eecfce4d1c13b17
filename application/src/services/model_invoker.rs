//! Backend routing for model calls.
//!
//! [`BackendRegistry`] resolves [`BackendKind`]s to adapters and orders the
//! candidates for a call (preferred, then primary, then fallbacks).
//! [`ModelInvoker`] walks those candidates, each behind its own
//! `model:<kind>` circuit, until enough of them have answered.

use super::circuit_breaker::{CallFailure, CircuitBreakerRegistry};
use crate::ports::model_backend::{BackendError, BackendKind, GenerationOptions, ModelBackend};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Confidence reported for answers a backend grounded with sources
pub const GROUNDED_CONFIDENCE: f64 = 0.85;
/// Confidence reported for ungrounded answers
pub const UNGROUNDED_CONFIDENCE: f64 = 0.7;

/// Errors surfaced by [`ModelInvoker::invoke`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvokeError {
    /// Every candidate was short-circuited or none is registered
    #[error("No model backend available")]
    NoModelAvailable,

    #[error("Only {succeeded} of {required} required backends answered")]
    InsufficientBackends { required: usize, succeeded: usize },

    #[error("Model call failed: {0}")]
    Failed(String),
}

/// Backends by kind plus the routing order
pub struct BackendRegistry {
    backends: HashMap<BackendKind, Arc<dyn ModelBackend>>,
    primary: BackendKind,
    fallbacks: Vec<BackendKind>,
}

impl BackendRegistry {
    pub fn new(primary: BackendKind) -> Self {
        Self {
            backends: HashMap::new(),
            primary,
            fallbacks: Vec::new(),
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn ModelBackend>) -> Self {
        self.backends.insert(backend.kind(), backend);
        self
    }

    pub fn with_fallbacks(mut self, fallbacks: impl IntoIterator<Item = BackendKind>) -> Self {
        self.fallbacks = fallbacks.into_iter().collect();
        self
    }

    pub fn get(&self, kind: BackendKind) -> Option<Arc<dyn ModelBackend>> {
        self.backends.get(&kind).cloned()
    }

    pub fn primary(&self) -> BackendKind {
        self.primary
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Registered kinds in routing order, without duplicates
    pub fn candidates(&self, preferred: Option<BackendKind>) -> Vec<BackendKind> {
        let mut order: Vec<BackendKind> = Vec::new();
        let routing = preferred
            .into_iter()
            .chain(std::iter::once(self.primary))
            .chain(self.fallbacks.iter().copied());
        for kind in routing {
            if self.backends.contains_key(&kind) && !order.contains(&kind) {
                order.push(kind);
            }
        }
        order
    }
}

/// Options for one logical model call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvokeOptions {
    /// Try this backend first
    pub preferred: Option<BackendKind>,
    /// Successful answers required
    pub min_backends: usize,
    /// Successful answers to collect before stopping
    pub max_backends: usize,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for InvokeOptions {
    fn default() -> Self {
        Self {
            preferred: None,
            min_backends: 1,
            max_backends: 1,
            temperature: 0.4,
            max_tokens: 2048,
        }
    }
}

impl InvokeOptions {
    pub fn new(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature,
            max_tokens,
            ..Self::default()
        }
    }

    pub fn with_preferred(mut self, preferred: Option<BackendKind>) -> Self {
        self.preferred = preferred;
        self
    }

    pub fn with_backends(mut self, min: usize, max: usize) -> Self {
        self.min_backends = min.max(1);
        self.max_backends = max.max(self.min_backends);
        self
    }
}

/// Result of a model call
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Text from the first backend that answered
    pub text: String,
    /// Mean confidence across answering backends
    pub confidence: f64,
    /// Union of grounding sources, first-seen order
    pub sources: Vec<String>,
    /// Backends that answered, in call order
    pub backends: Vec<BackendKind>,
}

pub struct ModelInvoker {
    registry: Arc<BackendRegistry>,
    breakers: Arc<CircuitBreakerRegistry>,
    timeout: Duration,
}

impl ModelInvoker {
    pub fn new(
        registry: Arc<BackendRegistry>,
        breakers: Arc<CircuitBreakerRegistry>,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            breakers,
            timeout,
        }
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    pub async fn invoke(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &InvokeOptions,
    ) -> Result<Invocation, InvokeError> {
        let generation_options = GenerationOptions {
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        let mut answers = Vec::new();
        let mut last_error: Option<String> = None;

        for kind in self.registry.candidates(options.preferred) {
            if answers.len() >= options.max_backends {
                break;
            }
            let Some(backend) = self.registry.get(kind) else {
                continue;
            };

            let outcome: Result<_, CallFailure<BackendError>> = self
                .breakers
                .execute_classified(
                    &kind.breaker_name(),
                    self.timeout,
                    |e: &BackendError| !e.is_client_error(),
                    || async {
                        backend
                            .generate(system_prompt, user_prompt, &generation_options)
                            .await
                            .map(Ok)
                    },
                    Err,
                )
                .await;

            match outcome {
                Ok(generation) => {
                    debug!("Backend {} answered", kind);
                    answers.push((kind, generation));
                }
                Err(CallFailure::Rejected) => {
                    debug!("Backend {} skipped, circuit open", kind);
                }
                Err(failure) => {
                    warn!("Backend {} failed: {}", kind, failure);
                    last_error = Some(format!("{}: {}", kind, failure));
                }
            }
        }

        if answers.is_empty() {
            return Err(match last_error {
                Some(message) => InvokeError::Failed(message),
                None => InvokeError::NoModelAvailable,
            });
        }
        if answers.len() < options.min_backends {
            return Err(InvokeError::InsufficientBackends {
                required: options.min_backends,
                succeeded: answers.len(),
            });
        }

        let confidence = answers
            .iter()
            .map(|(_, g)| {
                if g.sources.is_empty() {
                    UNGROUNDED_CONFIDENCE
                } else {
                    GROUNDED_CONFIDENCE
                }
            })
            .sum::<f64>()
            / answers.len() as f64;

        let mut sources: Vec<String> = Vec::new();
        for source in answers.iter().flat_map(|(_, g)| g.sources.iter()) {
            if !sources.contains(source) {
                sources.push(source.clone());
            }
        }

        let backends = answers.iter().map(|(kind, _)| *kind).collect();
        let text = answers
            .into_iter()
            .next()
            .map(|(_, g)| g.text)
            .unwrap_or_default();

        Ok(Invocation {
            text,
            confidence,
            sources,
            backends,
        })
    }
}
