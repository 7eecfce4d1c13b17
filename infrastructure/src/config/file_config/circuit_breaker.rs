//! Circuit breaker configuration from TOML (`[circuit_breaker]` section)

use crate::config::validation::{ConfigIssue, ConfigIssueCode};
use council_domain::BreakerPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCircuitBreakerConfig {
    /// Failures inside the window that open a circuit.
    pub failure_threshold: u32,
    pub window_secs: u64,
    /// First cool-down; doubles on every consecutive re-open.
    pub cooldown_secs: u64,
    pub max_cooldown_secs: u64,
}

impl Default for FileCircuitBreakerConfig {
    fn default() -> Self {
        let policy = BreakerPolicy::default();
        Self {
            failure_threshold: policy.failure_threshold,
            window_secs: policy.window.as_secs(),
            cooldown_secs: policy.cooldown.as_secs(),
            max_cooldown_secs: policy.max_cooldown.as_secs(),
        }
    }
}

impl FileCircuitBreakerConfig {
    pub fn to_policy(&self) -> (BreakerPolicy, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let defaults = BreakerPolicy::default();

        let failure_threshold = if self.failure_threshold == 0 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::InvalidValue {
                    field: "circuit_breaker.failure_threshold".to_string(),
                },
                format!(
                    "circuit_breaker.failure_threshold cannot be 0, using {}",
                    defaults.failure_threshold
                ),
            ));
            defaults.failure_threshold
        } else {
            self.failure_threshold
        };

        let max_cooldown_secs = if self.max_cooldown_secs < self.cooldown_secs {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::InvalidConstraint {
                    field: "circuit_breaker.max_cooldown_secs".to_string(),
                },
                format!(
                    "circuit_breaker.max_cooldown_secs ({}) is below cooldown_secs ({}), raising it",
                    self.max_cooldown_secs, self.cooldown_secs
                ),
            ));
            self.cooldown_secs
        } else {
            self.max_cooldown_secs
        };

        let policy = BreakerPolicy {
            failure_threshold,
            window: Duration::from_secs(self.window_secs),
            cooldown: Duration::from_secs(self.cooldown_secs),
            max_cooldown: Duration::from_secs(max_cooldown_secs),
        };
        (policy, issues)
    }
}
