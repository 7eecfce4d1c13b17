//! Named circuit breakers guarding every outbound call.
//!
//! One [`CircuitBreakerRegistry`] is shared by all concurrent requests. Each
//! dependency name (`"rag-query"`, `"model:gemini"`, ...) owns an independent
//! [`CircuitBreaker`]; all state changes happen under a single mutex that is
//! never held across an await point.

use crate::ports::clock::{Clock, SystemClock};
use council_domain::{Admission, BreakerPolicy, CircuitBreaker, CircuitState, Transition};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Why the primary did not produce a value
#[derive(Debug, Clone, PartialEq)]
pub enum CallFailure<E> {
    /// Circuit open; the primary was not attempted
    Rejected,
    /// The primary exceeded its timeout
    TimedOut,
    /// The primary returned an error
    Failed(E),
}

impl<E: std::fmt::Display> std::fmt::Display for CallFailure<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallFailure::Rejected => write!(f, "circuit open"),
            CallFailure::TimedOut => write!(f, "timed out"),
            CallFailure::Failed(e) => write!(f, "{}", e),
        }
    }
}

/// Process-wide set of named circuit breakers
pub struct CircuitBreakerRegistry {
    breakers: Mutex<HashMap<String, CircuitBreaker>>,
    policy: BreakerPolicy,
    clock: Arc<dyn Clock>,
}

impl CircuitBreakerRegistry {
    pub fn new(policy: BreakerPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            breakers: Mutex::new(HashMap::new()),
            policy,
            clock,
        }
    }

    pub fn with_policy(policy: BreakerPolicy) -> Self {
        Self::new(policy, Arc::new(SystemClock))
    }

    /// Run `primary` under the breaker named `name`.
    ///
    /// `primary` is bounded by `timeout`; a timeout counts as a failure.
    /// When the circuit is open, or the primary fails or times out,
    /// `fallback` produces the value instead. The fallback cannot fail.
    pub async fn execute<T, E, P, Fut, F>(
        &self,
        name: &str,
        timeout: Duration,
        primary: P,
        fallback: F,
    ) -> T
    where
        P: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        F: FnOnce(CallFailure<E>) -> T,
    {
        self.execute_classified(name, timeout, |_: &E| true, primary, fallback)
            .await
    }

    /// Like [`execute`](Self::execute), but only errors for which
    /// `is_fault` holds count against the circuit.
    ///
    /// Other errors mean the dependency answered and rejected this one
    /// call; they are recorded as successes and still go to `fallback`.
    pub async fn execute_classified<T, E, C, P, Fut, F>(
        &self,
        name: &str,
        timeout: Duration,
        is_fault: C,
        primary: P,
        fallback: F,
    ) -> T
    where
        C: FnOnce(&E) -> bool,
        P: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        F: FnOnce(CallFailure<E>) -> T,
    {
        let admission = {
            let mut breakers = self.lock();
            let breaker = breakers
                .entry(name.to_string())
                .or_insert_with(|| CircuitBreaker::new(self.policy.clone()));
            let (admission, transition) = breaker.admit(self.clock.now());
            log_transition(name, transition);
            admission
        };

        if admission == Admission::Rejected {
            debug!("Circuit {} is open, short-circuiting to fallback", name);
            return fallback(CallFailure::Rejected);
        }

        let mut probe = ProbeGuard {
            registry: self,
            name,
            armed: admission == Admission::Trial,
        };
        let outcome = tokio::time::timeout(timeout, primary()).await;
        probe.armed = false;

        match outcome {
            Ok(Ok(value)) => {
                self.record(name, admission, true);
                value
            }
            Ok(Err(e)) => {
                let fault = is_fault(&e);
                if !fault {
                    debug!("Call through circuit {} rejected by the dependency: not counted", name);
                }
                self.record(name, admission, !fault);
                fallback(CallFailure::Failed(e))
            }
            Err(_) => {
                warn!("Call through circuit {} timed out after {:?}", name, timeout);
                self.record(name, admission, false);
                fallback(CallFailure::TimedOut)
            }
        }
    }

    /// Current state of a named circuit; unknown names are closed
    pub fn state(&self, name: &str) -> CircuitState {
        self.lock()
            .get(name)
            .map(CircuitBreaker::state)
            .unwrap_or(CircuitState::Closed)
    }

    /// States of every circuit seen so far, sorted by name
    pub fn snapshot(&self) -> Vec<(String, CircuitState)> {
        let mut states: Vec<_> = self
            .lock()
            .iter()
            .map(|(name, breaker)| (name.clone(), breaker.state()))
            .collect();
        states.sort_by(|a, b| a.0.cmp(&b.0));
        states
    }

    fn record(&self, name: &str, admission: Admission, success: bool) {
        let now = self.clock.now();
        let mut breakers = self.lock();
        if let Some(breaker) = breakers.get_mut(name) {
            let transition = if success {
                breaker.record_success(admission, now)
            } else {
                breaker.record_failure(admission, now)
            };
            log_transition(name, transition);
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CircuitBreaker>> {
        self.breakers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::with_policy(BreakerPolicy::default())
    }
}

/// Releases an abandoned half-open probe.
///
/// If the future running a trial call is dropped (caller timeout or
/// cancellation), the probe is recorded as a failure so the circuit
/// does not stay half-open forever.
struct ProbeGuard<'a> {
    registry: &'a CircuitBreakerRegistry,
    name: &'a str,
    armed: bool,
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            debug!("Half-open probe on {} abandoned", self.name);
            self.registry.record(self.name, Admission::Trial, false);
        }
    }
}

fn log_transition(name: &str, transition: Option<Transition>) {
    let Some(Transition { from, to }) = transition else {
        return;
    };
    match to {
        CircuitState::Open => warn!("Circuit {} {} -> {}", name, from, to),
        CircuitState::HalfOpen | CircuitState::Closed => {
            info!("Circuit {} {} -> {}", name, from, to)
        }
    }
}
