//! Configuration file loading for startup-council
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `COUNCIL_` prefixed environment variables, `__` separating sections
//! 2. `--config <path>` specified file
//! 3. Project root: `./council.toml` or `./.council.toml`
//! 4. Global: `~/.config/startup-council/config.toml`
//! 5. Default values

mod file_config;
mod loader;
mod validation;

pub use file_config::{
    FileCacheConfig, FileCircuitBreakerConfig, FileConfig, FileCouncilConfig, FileGeminiConfig,
    FileModelsConfig, FileOpenAiConfig, FileOutputConfig, FilePipelineConfig, FileRetrievalConfig,
};
pub use loader::ConfigLoader;
pub use validation::{ConfigIssue, ConfigIssueCode, Severity};
