//! Model backend port
//!
//! Defines the interface for generating text with one LLM provider.
//! Adapters (Gemini, OpenAI-compatible) live in the infrastructure layer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The fixed set of backend capability classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Gemini,
    OpenAi,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Gemini => "gemini",
            BackendKind::OpenAi => "openai",
        }
    }

    pub fn all() -> [BackendKind; 2] {
        [BackendKind::Gemini, BackendKind::OpenAi]
    }

    /// Name of the circuit guarding this backend
    pub fn breaker_name(&self) -> String {
        format!("model:{}", self.as_str())
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(BackendKind::Gemini),
            "openai" | "open-ai" | "open_ai" => Ok(BackendKind::OpenAi),
            other => Err(BackendError::NotConfigured(other.to_string())),
        }
    }
}

/// Sampling options for one generation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.4,
            max_tokens: 2048,
        }
    }
}

/// Text produced by a backend, with any grounding it reported
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Generation {
    pub text: String,
    /// Grounding URLs or titles supplied by the backend
    pub sources: Vec<String>,
}

impl Generation {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sources: Vec::new(),
        }
    }

    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = sources;
        self
    }
}

/// Errors that can occur while calling one backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Backend not configured: {0}")]
    NotConfigured(String),

    #[error("Connection error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Backend returned no text")]
    EmptyResponse,
}

impl BackendError {
    /// The service rejected this one request (4xx other than 408/429);
    /// not counted against its circuit
    pub fn is_client_error(&self) -> bool {
        matches!(self, BackendError::Status { status, .. }
            if (400..500).contains(status) && *status != 408 && *status != 429)
    }
}

/// One LLM provider
#[async_trait]
pub trait ModelBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Generate a completion for a system + user prompt pair
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Generation, BackendError>;
}
