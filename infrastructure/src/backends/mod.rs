//! HTTP model backends and registry assembly
//!
//! Each backend implements [`ModelBackend`]. [`build_backend_registry`]
//! instantiates every backend the `[models]` section routes to, skipping
//! those without credentials.

mod gemini;
mod http;
mod openai;

pub use gemini::GeminiBackend;
pub use openai::OpenAiBackend;

use crate::config::{ConfigIssue, ConfigIssueCode, FileModelsConfig};
use council_application::{BackendKind, BackendRegistry, ModelBackend};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Build the registry for the configured routing.
///
/// Routed backends with no API key are left out and reported as
/// warnings. An empty registry makes every model call fail with
/// "no model backend available".
pub fn build_backend_registry(
    config: &FileModelsConfig,
    timeout: Duration,
) -> (BackendRegistry, Vec<ConfigIssue>) {
    let (primary, mut issues) = config.parse_primary();
    let (fallbacks, fallback_issues) = config.parse_fallbacks();
    issues.extend(fallback_issues);

    let mut routed = vec![primary];
    for kind in &fallbacks {
        if !routed.contains(kind) {
            routed.push(*kind);
        }
    }

    let mut registry = BackendRegistry::new(primary).with_fallbacks(fallbacks);
    for kind in routed {
        match try_backend(config, kind, timeout) {
            Ok(backend) => {
                info!("Model backend {} initialized", kind);
                registry = registry.with_backend(backend);
            }
            Err(issue) => {
                warn!("Model backend {} not available: {}", kind, issue.message);
                issues.push(issue);
            }
        }
    }

    (registry, issues)
}

fn try_backend(
    config: &FileModelsConfig,
    kind: BackendKind,
    timeout: Duration,
) -> Result<Arc<dyn ModelBackend>, ConfigIssue> {
    let missing = |env: &str| {
        ConfigIssue::warning(
            ConfigIssueCode::MissingCredential {
                env: env.to_string(),
            },
            format!("models.{}: no API key (set {})", kind, env),
        )
    };
    let failed = |e: council_application::BackendError| {
        ConfigIssue::warning(
            ConfigIssueCode::InvalidValue {
                field: format!("models.{}", kind),
            },
            format!("models.{}: {}", kind, e),
        )
    };

    match kind {
        BackendKind::Gemini => {
            let settings = &config.gemini;
            let key = settings
                .resolve_api_key()
                .ok_or_else(|| missing(&settings.api_key_env))?;
            let backend = GeminiBackend::new(key, &settings.model, &settings.base_url, timeout)
                .map_err(failed)?
                .with_grounding(settings.grounding);
            Ok(Arc::new(backend))
        }
        BackendKind::OpenAi => {
            let settings = &config.openai;
            let key = settings
                .resolve_api_key()
                .ok_or_else(|| missing(&settings.api_key_env))?;
            let backend = OpenAiBackend::new(key, &settings.model, &settings.base_url, timeout)
                .map_err(failed)?;
            Ok(Arc::new(backend))
        }
    }
}
