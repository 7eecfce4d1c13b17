//! Resilience primitives for outbound calls.

pub mod circuit;

pub use circuit::{Admission, BreakerPolicy, CircuitBreaker, CircuitState, Transition};
