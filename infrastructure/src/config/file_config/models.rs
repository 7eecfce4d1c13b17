//! Model backend configuration from TOML (`[models]` section)

use crate::config::validation::{ConfigIssue, ConfigIssueCode};
use council_application::BackendKind;
use serde::{Deserialize, Serialize};

/// Backend routing and per-backend settings
///
/// # Example
///
/// ```toml
/// [models]
/// primary = "gemini"
/// fallbacks = ["openai"]
///
/// [models.gemini]
/// model = "gemini-2.0-flash"
///
/// [models.openai]
/// model = "gpt-4o-mini"
/// base_url = "https://api.openai.com/v1"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileModelsConfig {
    /// Backend tried first for every call
    pub primary: String,
    /// Backends tried in order when the primary fails or is short-circuited
    pub fallbacks: Vec<String>,
    pub gemini: FileGeminiConfig,
    pub openai: FileOpenAiConfig,
}

impl Default for FileModelsConfig {
    fn default() -> Self {
        Self {
            primary: "gemini".to_string(),
            fallbacks: vec!["openai".to_string()],
            gemini: FileGeminiConfig::default(),
            openai: FileOpenAiConfig::default(),
        }
    }
}

/// Gemini `generateContent` settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGeminiConfig {
    pub model: String,
    /// Environment variable name for the API key (default: "GEMINI_API_KEY").
    pub api_key_env: String,
    /// Direct API key (not recommended, use the env var instead).
    pub api_key: Option<String>,
    pub base_url: String,
    /// Enable Google Search grounding; grounded answers carry web sources.
    pub grounding: bool,
}

impl Default for FileGeminiConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            grounding: true,
        }
    }
}

impl FileGeminiConfig {
    pub fn resolve_api_key(&self) -> Option<String> {
        super::resolve_api_key(self.api_key.as_deref(), &self.api_key_env)
    }
}

/// OpenAI-compatible chat completions settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOpenAiConfig {
    pub model: String,
    /// Environment variable name for the API key (default: "OPENAI_API_KEY").
    pub api_key_env: String,
    /// Direct API key (not recommended, use the env var instead).
    pub api_key: Option<String>,
    /// Base URL (can be pointed at any OpenAI-compatible server).
    pub base_url: String,
}

impl Default for FileOpenAiConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

impl FileOpenAiConfig {
    pub fn resolve_api_key(&self) -> Option<String> {
        super::resolve_api_key(self.api_key.as_deref(), &self.api_key_env)
    }
}

impl FileModelsConfig {
    fn unknown_backend(field: &str, value: &str) -> ConfigIssue {
        ConfigIssue::error(
            ConfigIssueCode::UnknownBackend {
                field: field.to_string(),
                value: value.to_string(),
            },
            format!(
                "{}: unknown backend '{}' (expected one of: {})",
                field,
                value,
                BackendKind::all()
                    .iter()
                    .map(|k| k.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        )
    }

    /// Parse the primary backend name. Unknown names fall back to Gemini.
    pub fn parse_primary(&self) -> (BackendKind, Vec<ConfigIssue>) {
        match self.primary.parse::<BackendKind>() {
            Ok(kind) => (kind, vec![]),
            Err(_) => (
                BackendKind::Gemini,
                vec![Self::unknown_backend("models.primary", &self.primary)],
            ),
        }
    }

    /// Parse fallback names, skipping unknown ones.
    pub fn parse_fallbacks(&self) -> (Vec<BackendKind>, Vec<ConfigIssue>) {
        let mut kinds = Vec::new();
        let mut issues = Vec::new();
        for name in &self.fallbacks {
            match name.parse::<BackendKind>() {
                Ok(kind) => kinds.push(kind),
                Err(_) => issues.push(Self::unknown_backend("models.fallbacks", name)),
            }
        }
        (kinds, issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let config = FileModelsConfig::default();
        assert_eq!(config.parse_primary(), (BackendKind::Gemini, vec![]));
        assert_eq!(config.parse_fallbacks(), (vec![BackendKind::OpenAi], vec![]));
    }

    #[test]
    fn test_unknown_backends_reported() {
        let config = FileModelsConfig {
            primary: "claude".to_string(),
            fallbacks: vec!["openai".to_string(), "bard".to_string()],
            ..Default::default()
        };

        let (primary, issues) = config.parse_primary();
        assert_eq!(primary, BackendKind::Gemini);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].is_error());

        let (fallbacks, issues) = config.parse_fallbacks();
        assert_eq!(fallbacks, vec![BackendKind::OpenAi]);
        assert_eq!(
            issues[0].code,
            ConfigIssueCode::UnknownBackend {
                field: "models.fallbacks".to_string(),
                value: "bard".to_string(),
            }
        );
    }
}
