//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod clock;
pub mod council_logger;
pub mod model_backend;
pub mod progress;
pub mod retrieval;
