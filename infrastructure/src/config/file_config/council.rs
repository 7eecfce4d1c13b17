//! Council round configuration from TOML (`[council]` section)

use super::pipeline::checked_temperature;
use crate::config::validation::{ConfigIssue, ConfigIssueCode};
use council_application::CouncilParams;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCouncilConfig {
    /// Maximum cross-critique calls in flight
    pub critique_concurrency: usize,
    pub critique_temperature: f32,
    pub critique_max_tokens: u32,
    pub synthesis_temperature: f32,
    pub synthesis_max_tokens: u32,
    /// Characters of each non-seed answer shown to the synthesizer
    pub excerpt_chars: usize,
    pub request_timeout_secs: u64,
}

impl Default for FileCouncilConfig {
    fn default() -> Self {
        let params = CouncilParams::default();
        Self {
            critique_concurrency: params.critique_concurrency,
            critique_temperature: params.critique_temperature,
            critique_max_tokens: params.critique_max_tokens,
            synthesis_temperature: params.synthesis_temperature,
            synthesis_max_tokens: params.synthesis_max_tokens,
            excerpt_chars: params.excerpt_chars,
            request_timeout_secs: params.request_timeout.as_secs(),
        }
    }
}

impl FileCouncilConfig {
    pub fn to_params(&self) -> (CouncilParams, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let defaults = CouncilParams::default();

        if self.critique_concurrency == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::InvalidValue {
                    field: "council.critique_concurrency".to_string(),
                },
                "council.critique_concurrency cannot be 0",
            ));
        }
        if self.request_timeout_secs == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::InvalidValue {
                    field: "council.request_timeout_secs".to_string(),
                },
                "council.request_timeout_secs cannot be 0",
            ));
        }

        let params = CouncilParams {
            critique_temperature: checked_temperature(
                "council.critique_temperature",
                self.critique_temperature,
                defaults.critique_temperature,
                &mut issues,
            ),
            synthesis_temperature: checked_temperature(
                "council.synthesis_temperature",
                self.synthesis_temperature,
                defaults.synthesis_temperature,
                &mut issues,
            ),
            critique_max_tokens: self.critique_max_tokens,
            synthesis_max_tokens: self.synthesis_max_tokens,
            excerpt_chars: self.excerpt_chars,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            ..defaults
        }
        .with_critique_concurrency(self.critique_concurrency.max(1));
        (params, issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> FileCouncilConfig {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn test_values_carried_into_params() {
        let (params, issues) = parse(
            r#"
critique_concurrency = 2
critique_temperature = 0.1
synthesis_temperature = 0.5
excerpt_chars = 300
request_timeout_secs = 90
"#,
        )
        .to_params();
        assert!(issues.is_empty());
        assert_eq!(params.critique_concurrency, 2);
        assert_eq!(params.critique_temperature, 0.1);
        assert_eq!(params.synthesis_temperature, 0.5);
        assert_eq!(params.excerpt_chars, 300);
        assert_eq!(params.request_timeout, Duration::from_secs(90));
    }

    #[test]
    fn test_zero_concurrency_is_an_error() {
        let (params, issues) = parse("critique_concurrency = 0").to_params();
        assert_eq!(params.critique_concurrency, 1);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].is_error());
    }

    #[test]
    fn test_zero_timeout_is_an_error() {
        let (_, issues) = parse("request_timeout_secs = 0").to_params();
        assert_eq!(
            issues.iter().map(|i| &i.code).collect::<Vec<_>>(),
            vec![&ConfigIssueCode::InvalidValue {
                field: "council.request_timeout_secs".to_string()
            }]
        );
        assert!(issues[0].is_error());
    }

    #[test]
    fn test_out_of_range_temperatures_fall_back() {
        let (params, issues) = parse("critique_temperature = 2.5\nsynthesis_temperature = -1.0").to_params();
        let defaults = CouncilParams::default();
        assert_eq!(params.critique_temperature, defaults.critique_temperature);
        assert_eq!(params.synthesis_temperature, defaults.synthesis_temperature);
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| !i.is_error()));
    }
}
