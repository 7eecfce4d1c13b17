//! Application-level configuration.
//!
//! This module provides configuration types that control how services and
//! use cases behave:
//!
//! - [`CacheSettings`] - context cache TTLs and popularity threshold
//! - [`PipelineParams`] - single-agent pipeline control
//! - [`CouncilParams`] - council round control
//!
//! Circuit breaker thresholds use the domain's
//! [`BreakerPolicy`](council_domain::BreakerPolicy) directly.

pub mod cache_settings;
pub mod execution_params;

pub use cache_settings::CacheSettings;
pub use execution_params::{CouncilParams, PipelineParams};
