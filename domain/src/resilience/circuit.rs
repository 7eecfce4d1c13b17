//! Circuit breaker state machine
//!
//! Pure bookkeeping for one named dependency. Callers pass the current
//! time in, so the machine can be driven deterministically in tests. The
//! application layer wraps it with locking, timeouts and fallbacks.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Calls flow normally
    Closed,
    /// Calls are short-circuited to the fallback
    Open,
    /// Cool-down elapsed; one trial call decides the next state
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half-open",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Thresholds and timings shared by every breaker in a registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerPolicy {
    /// Failures within `window` that open the circuit
    pub failure_threshold: u32,
    /// Rolling window for counting failures
    pub window: Duration,
    /// Cool-down after the first opening
    pub cooldown: Duration,
    /// Upper bound for the exponentially growing cool-down
    pub max_cooldown: Duration,
}

impl Default for BreakerPolicy {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            window: Duration::from_secs(60),
            cooldown: Duration::from_secs(30),
            max_cooldown: Duration::from_secs(300),
        }
    }
}

impl BreakerPolicy {
    /// Cool-down for the `n`-th consecutive opening (1-based)
    pub fn cooldown_for(&self, consecutive_opens: u32) -> Duration {
        let exponent = consecutive_opens.saturating_sub(1).min(16);
        self.cooldown
            .saturating_mul(1u32 << exponent)
            .min(self.max_cooldown)
    }
}

/// Decision for one incoming call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Closed circuit: run the primary
    Allowed,
    /// This caller holds the single half-open probe
    Trial,
    /// Short-circuit to the fallback without touching the dependency
    Rejected,
}

/// A state change worth logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: CircuitState,
    pub to: CircuitState,
}

/// Failure accounting for one dependency
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    state: CircuitState,
    failures: VecDeque<Instant>,
    opened_until: Option<Instant>,
    consecutive_opens: u32,
    trial_in_flight: bool,
    policy: BreakerPolicy,
}

impl CircuitBreaker {
    pub fn new(policy: BreakerPolicy) -> Self {
        Self {
            state: CircuitState::Closed,
            failures: VecDeque::new(),
            opened_until: None,
            consecutive_opens: 0,
            trial_in_flight: false,
            policy,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn opened_until(&self) -> Option<Instant> {
        self.opened_until
    }

    /// Failures currently counted inside the rolling window
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Decide whether a call may proceed.
    ///
    /// An open circuit whose cool-down has elapsed moves to half-open and
    /// hands the probe to exactly one caller; everyone else is rejected
    /// until that probe settles.
    pub fn admit(&mut self, now: Instant) -> (Admission, Option<Transition>) {
        match self.state {
            CircuitState::Closed => (Admission::Allowed, None),
            CircuitState::Open => {
                let cooled_down = self.opened_until.is_none_or(|until| now >= until);
                if cooled_down {
                    self.trial_in_flight = true;
                    let transition = self.move_to(CircuitState::HalfOpen);
                    (Admission::Trial, transition)
                } else {
                    (Admission::Rejected, None)
                }
            }
            CircuitState::HalfOpen => {
                if self.trial_in_flight {
                    (Admission::Rejected, None)
                } else {
                    self.trial_in_flight = true;
                    (Admission::Trial, None)
                }
            }
        }
    }

    /// Record a successful call admitted as `admission`.
    ///
    /// Only the probe holder can close a half-open circuit. Results of
    /// calls admitted while closed are ignored once the circuit has left
    /// the closed state.
    pub fn record_success(&mut self, admission: Admission, _now: Instant) -> Option<Transition> {
        match (self.state, admission) {
            (CircuitState::Closed, Admission::Allowed) => {
                self.failures.clear();
                None
            }
            (CircuitState::HalfOpen, Admission::Trial) if self.trial_in_flight => {
                self.failures.clear();
                self.opened_until = None;
                self.consecutive_opens = 0;
                self.trial_in_flight = false;
                self.move_to(CircuitState::Closed)
            }
            _ => None,
        }
    }

    /// Record a failed call admitted as `admission`
    pub fn record_failure(&mut self, admission: Admission, now: Instant) -> Option<Transition> {
        match (self.state, admission) {
            (CircuitState::Closed, Admission::Allowed) => {
                self.failures.push_back(now);
                self.prune(now);
                if self.failures.len() >= self.policy.failure_threshold as usize {
                    self.open(now)
                } else {
                    None
                }
            }
            (CircuitState::HalfOpen, Admission::Trial) if self.trial_in_flight => self.open(now),
            _ => None,
        }
    }

    fn open(&mut self, now: Instant) -> Option<Transition> {
        self.consecutive_opens = self.consecutive_opens.saturating_add(1);
        self.opened_until = Some(now + self.policy.cooldown_for(self.consecutive_opens));
        self.failures.clear();
        self.trial_in_flight = false;
        self.move_to(CircuitState::Open)
    }

    fn prune(&mut self, now: Instant) {
        while let Some(oldest) = self.failures.front() {
            if now.saturating_duration_since(*oldest) > self.policy.window {
                self.failures.pop_front();
            } else {
                break;
            }
        }
    }

    fn move_to(&mut self, to: CircuitState) -> Option<Transition> {
        let from = self.state;
        self.state = to;
        (from != to).then_some(Transition { from, to })
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(BreakerPolicy::default())
    }
}
