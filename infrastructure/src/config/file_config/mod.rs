//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! Every section is `#[serde(default)]`, so a partial file is valid.

mod cache;
mod circuit_breaker;
mod council;
mod models;
mod output;
mod pipeline;
mod retrieval;

pub use cache::FileCacheConfig;
pub use circuit_breaker::FileCircuitBreakerConfig;
pub use council::FileCouncilConfig;
pub use models::{FileGeminiConfig, FileModelsConfig, FileOpenAiConfig};
pub use output::FileOutputConfig;
pub use pipeline::FilePipelineConfig;
pub use retrieval::FileRetrievalConfig;

use super::validation::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub cache: FileCacheConfig,
    pub circuit_breaker: FileCircuitBreakerConfig,
    pub retrieval: FileRetrievalConfig,
    pub models: FileModelsConfig,
    pub pipeline: FilePipelineConfig,
    pub council: FileCouncilConfig,
    pub output: FileOutputConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    ///
    /// Checks every section conversion, backend names, and the output format.
    /// Missing API keys are not reported here; they are only known once the
    /// environment is read while building backends.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        issues.extend(self.cache.to_settings().1);
        issues.extend(self.circuit_breaker.to_policy().1);
        issues.extend(self.models.parse_primary().1);
        issues.extend(self.models.parse_fallbacks().1);
        issues.extend(self.pipeline.to_params(self.retrieval.limit).1);
        issues.extend(self.council.to_params().1);

        if !(1..=20).contains(&self.retrieval.limit) {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::InvalidValue {
                    field: "retrieval.limit".to_string(),
                },
                format!(
                    "retrieval.limit ({}) is outside 1-20 and will be clamped",
                    self.retrieval.limit
                ),
            ));
        }

        if let Some(format) = &self.output.format
            && !matches!(format.to_lowercase().as_str(), "text" | "json")
        {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::InvalidValue {
                    field: "output.format".to_string(),
                },
                format!("output.format: unknown value '{}', falling back to 'text'", format),
            ));
        }

        issues
    }
}

/// Explicit key first, then the named environment variable
pub(crate) fn resolve_api_key(explicit: Option<&str>, env: &str) -> Option<String> {
    explicit
        .map(str::to_string)
        .or_else(|| std::env::var(env).ok())
        .filter(|key| !key.trim().is_empty())
}
