//! Retrieval service configuration from TOML (`[retrieval]` section)

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRetrievalConfig {
    /// Base URL of the RAG service; `/rag/query` is appended.
    pub base_url: String,
    /// Environment variable holding the `X-API-Key` value.
    pub api_key_env: String,
    /// Direct API key (not recommended, use the env var instead).
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Chunks requested per query, clamped to 1..=20.
    pub limit: u8,
}

impl Default for FileRetrievalConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_key_env: "RAG_API_KEY".to_string(),
            api_key: None,
            timeout_secs: 30,
            limit: 5,
        }
    }
}

impl FileRetrievalConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Explicit key first, then the configured environment variable
    pub fn resolve_api_key(&self) -> Option<String> {
        super::resolve_api_key(self.api_key.as_deref(), &self.api_key_env)
    }
}
