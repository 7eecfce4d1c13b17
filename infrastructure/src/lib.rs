//! Infrastructure layer for startup-council
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod backends;
pub mod config;
pub mod logging;
pub mod retrieval;

// Re-export commonly used types
pub use backends::{GeminiBackend, OpenAiBackend, build_backend_registry};
pub use config::{ConfigIssue, ConfigIssueCode, ConfigLoader, FileConfig, Severity};
pub use logging::JsonlCouncilLogger;
pub use retrieval::HttpRetrievalClient;
