//! Context cache tier durations.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// TTLs and promotion threshold for [`ContextCache`](crate::services::context_cache::ContextCache).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    pub fresh_ttl: Duration,
    pub stale_ttl: Duration,
    /// Fresh lifetime granted to popular entries.
    pub popular_ttl: Duration,
    /// Hits after which an entry counts as popular.
    pub popular_threshold: u32,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            fresh_ttl: Duration::from_secs(30 * 60),
            stale_ttl: Duration::from_secs(120 * 60),
            popular_ttl: Duration::from_secs(60 * 60),
            popular_threshold: 5,
        }
    }
}
