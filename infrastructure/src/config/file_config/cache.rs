//! Context cache configuration from TOML (`[cache]` section)

use crate::config::validation::{ConfigIssue, ConfigIssueCode};
use council_application::CacheSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Context cache configuration from TOML.
///
/// # Example
///
/// ```toml
/// [cache]
/// fresh_ttl_secs = 1800
/// stale_ttl_secs = 7200
/// popular_ttl_secs = 3600
/// popular_threshold = 5
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCacheConfig {
    /// Seconds an entry is served without contacting retrieval.
    pub fresh_ttl_secs: u64,
    /// Seconds an entry may still be served while retrieval is down.
    pub stale_ttl_secs: u64,
    /// Fresh lifetime granted to popular entries.
    pub popular_ttl_secs: u64,
    /// Hits after which an entry counts as popular.
    pub popular_threshold: u32,
}

impl Default for FileCacheConfig {
    fn default() -> Self {
        let settings = CacheSettings::default();
        Self {
            fresh_ttl_secs: settings.fresh_ttl.as_secs(),
            stale_ttl_secs: settings.stale_ttl.as_secs(),
            popular_ttl_secs: settings.popular_ttl.as_secs(),
            popular_threshold: settings.popular_threshold,
        }
    }
}

impl FileCacheConfig {
    /// Convert to [`CacheSettings`], returning validation issues.
    ///
    /// A fresh TTL longer than the stale TTL falls back to the defaults.
    pub fn to_settings(&self) -> (CacheSettings, Vec<ConfigIssue>) {
        if self.fresh_ttl_secs > self.stale_ttl_secs {
            let issue = ConfigIssue::warning(
                ConfigIssueCode::InvalidConstraint {
                    field: "cache.fresh_ttl_secs".to_string(),
                },
                format!(
                    "cache: fresh_ttl_secs ({}) exceeds stale_ttl_secs ({}), using defaults",
                    self.fresh_ttl_secs, self.stale_ttl_secs
                ),
            );
            return (CacheSettings::default(), vec![issue]);
        }

        let settings = CacheSettings {
            fresh_ttl: Duration::from_secs(self.fresh_ttl_secs),
            stale_ttl: Duration::from_secs(self.stale_ttl_secs),
            popular_ttl: Duration::from_secs(self.popular_ttl_secs),
            popular_threshold: self.popular_threshold,
        };
        (settings, vec![])
    }
}
