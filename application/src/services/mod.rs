//! Stateful services shared across requests
//!
//! One instance of each per process, injected into the use cases.

pub mod circuit_breaker;
pub mod context_cache;
pub mod context_provider;
pub mod model_invoker;
