//! Single-agent pipeline configuration from TOML (`[pipeline]` section)

use crate::config::validation::{ConfigIssue, ConfigIssueCode};
use council_application::PipelineParams;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePipelineConfig {
    /// Run the self-critique pass between draft and final answer
    pub self_critique: bool,
    pub draft_temperature: f32,
    pub draft_max_tokens: u32,
    /// Refine when the self-critique score is below this
    pub refine_below: u8,
    pub self_critique_temperature: f32,
    pub self_critique_max_tokens: u32,
    /// Bound on one model backend call
    pub model_timeout_secs: u64,
    /// Bound on one whole single-agent request
    pub request_timeout_secs: u64,
}

impl Default for FilePipelineConfig {
    fn default() -> Self {
        let params = PipelineParams::default();
        Self {
            self_critique: params.self_critique,
            draft_temperature: params.draft_temperature,
            draft_max_tokens: params.draft_max_tokens,
            refine_below: params.refine_below,
            self_critique_temperature: params.self_critique_temperature,
            self_critique_max_tokens: params.self_critique_max_tokens,
            model_timeout_secs: 60,
            request_timeout_secs: params.request_timeout.as_secs(),
        }
    }
}

impl FilePipelineConfig {
    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }

    /// Convert to [`PipelineParams`]; `retrieval_limit` comes from `[retrieval]`.
    pub fn to_params(&self, retrieval_limit: u8) -> (PipelineParams, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let defaults = PipelineParams::default();

        let draft_temperature = checked_temperature(
            "pipeline.draft_temperature",
            self.draft_temperature,
            defaults.draft_temperature,
            &mut issues,
        );
        let self_critique_temperature = checked_temperature(
            "pipeline.self_critique_temperature",
            self.self_critique_temperature,
            defaults.self_critique_temperature,
            &mut issues,
        );

        if self.refine_below > 11 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::InvalidValue {
                    field: "pipeline.refine_below".to_string(),
                },
                format!(
                    "pipeline.refine_below ({}) is above the 1-10 score scale; every draft is refined",
                    self.refine_below
                ),
            ));
        }

        let params = PipelineParams {
            self_critique: self.self_critique,
            refine_below: self.refine_below,
            draft_temperature,
            draft_max_tokens: self.draft_max_tokens,
            self_critique_temperature,
            self_critique_max_tokens: self.self_critique_max_tokens,
            retrieval_limit,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        };
        (params, issues)
    }
}

/// Temperatures outside `0.0..=2.0` fall back to `default`
pub(super) fn checked_temperature(
    field: &str,
    value: f32,
    default: f32,
    issues: &mut Vec<ConfigIssue>,
) -> f32 {
    if (0.0..=2.0).contains(&value) {
        value
    } else {
        issues.push(ConfigIssue::warning(
            ConfigIssueCode::InvalidValue {
                field: field.to_string(),
            },
            format!("{}: {} is outside 0.0-2.0, using {}", field, value, default),
        ));
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::validation::Severity;

    fn parse(toml_str: &str) -> FilePipelineConfig {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn test_defaults_convert_cleanly() {
        let (params, issues) = FilePipelineConfig::default().to_params(5);
        assert!(issues.is_empty());
        assert!(params.self_critique);
        assert_eq!(params.refine_below, 9);
        assert_eq!(params.retrieval_limit, 5);
        assert_eq!(params.request_timeout, Duration::from_secs(180));
    }

    #[test]
    fn test_values_carried_into_params() {
        let config = parse(
            r#"
self_critique = false
draft_temperature = 0.9
draft_max_tokens = 1024
refine_below = 7
request_timeout_secs = 45
model_timeout_secs = 20
"#,
        );
        let (params, issues) = config.to_params(8);
        assert!(issues.is_empty());
        assert!(!params.self_critique);
        assert_eq!(params.draft_temperature, 0.9);
        assert_eq!(params.draft_max_tokens, 1024);
        assert_eq!(params.refine_below, 7);
        assert_eq!(params.retrieval_limit, 8);
        assert_eq!(params.request_timeout, Duration::from_secs(45));
        assert_eq!(config.model_timeout(), Duration::from_secs(20));
    }

    #[test]
    fn test_out_of_range_temperature_falls_back() {
        let config = parse(
            r#"
draft_temperature = 3.5
self_critique_temperature = -0.1
"#,
        );
        let (params, issues) = config.to_params(5);
        let defaults = PipelineParams::default();

        assert_eq!(params.draft_temperature, defaults.draft_temperature);
        assert_eq!(params.self_critique_temperature, defaults.self_critique_temperature);
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.severity == Severity::Warning));
        assert_eq!(
            issues[0].code,
            ConfigIssueCode::InvalidValue {
                field: "pipeline.draft_temperature".to_string()
            }
        );
    }

    #[test]
    fn test_boundary_temperatures_accepted() {
        let config = parse("draft_temperature = 0.0\nself_critique_temperature = 2.0\n");
        let (params, issues) = config.to_params(5);
        assert!(issues.is_empty());
        assert_eq!(params.draft_temperature, 0.0);
        assert_eq!(params.self_critique_temperature, 2.0);
    }

    #[test]
    fn test_refine_below_above_scale_warns() {
        let (params, issues) = parse("refine_below = 12").to_params(5);
        assert_eq!(params.refine_below, 12);
        assert_eq!(issues.len(), 1);
        assert!(!issues[0].is_error());
        assert!(issues[0].message.contains("every draft is refined"));

        let (_, issues) = parse("refine_below = 11").to_params(5);
        assert!(issues.is_empty());
    }
}
