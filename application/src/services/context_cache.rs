//! Dual-tier cache for retrieval results.
//!
//! Every entry carries two deadlines written together by [`ContextCache::set`]:
//! the fresh tier answers normal lookups, the stale tier survives longer and
//! is only read as a fallback when live retrieval is degraded.
//!
//! ```text
//! set ─────────────┬──────────────────────────────┐
//!                  fresh_until                    stale_until
//! get        ✓ ✓ ✓ │ ✗ ✗ ✗ ✗ ✗ ✗ ✗ ✗ ✗ ✗ ✗ ✗ ✗ ✗ │
//! get_stale  ✓ ✓ ✓ │ ✓ ✓ ✓ ✓ ✓ ✓ ✓ ✓ ✓ ✓ ✓ ✓ ✓ ✓ │ ✗
//! ```
//!
//! Popular entries (more than `popular_threshold` fresh hits) have their
//! fresh deadline pushed out to `popular_ttl`, never past `stale_until`.

use crate::config::CacheSettings;
use crate::ports::clock::{Clock, SystemClock};
use council_domain::{ContextQuery, ContextResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;
use tracing::debug;

#[derive(Debug)]
struct CacheEntry {
    value: ContextResult,
    fresh_until: Instant,
    stale_until: Instant,
    /// Bumped under the read lock
    access_count: AtomicU32,
}

/// Expiry deadlines of one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheExpiry {
    pub fresh_until: Instant,
    pub stale_until: Instant,
    pub access_count: u32,
}

/// In-process context cache keyed by [`ContextQuery::cache_key`]
pub struct ContextCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    settings: CacheSettings,
    clock: Arc<dyn Clock>,
}

impl ContextCache {
    pub fn new(settings: CacheSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            settings,
            clock,
        }
    }

    pub fn with_settings(settings: CacheSettings) -> Self {
        Self::new(settings, Arc::new(SystemClock))
    }

    /// Fresh-tier lookup; counts the hit and promotes popular entries.
    ///
    /// Lookups share the read lock. The write lock is only taken when a
    /// popular entry's fresh deadline moves.
    pub fn get(&self, query: &ContextQuery) -> Option<ContextResult> {
        let key = query.cache_key();
        let now = self.clock.now();

        let (value, promotion) = {
            let entries = self.read();
            let Some(entry) = entries.get(&key) else {
                debug!("Context cache miss ({})", &key[..12]);
                return None;
            };
            if now >= entry.fresh_until {
                debug!("Context cache fresh tier expired ({})", &key[..12]);
                return None;
            }

            let hits = entry
                .access_count
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                    Some(n.saturating_add(1))
                })
                .unwrap_or_else(|n| n)
                .saturating_add(1);
            let promoted = (now + self.settings.popular_ttl).min(entry.stale_until);
            let promotion = (hits > self.settings.popular_threshold
                && promoted > entry.fresh_until)
                .then_some(promoted);
            (entry.value.clone(), promotion)
        };

        if let Some(promoted) = promotion {
            self.promote(&key, promoted);
        }

        debug!("Context cache hit ({})", &key[..12]);
        Some(value)
    }

    fn promote(&self, key: &str, promoted: Instant) {
        let mut entries = self.write();
        // The entry may have been replaced by `set` since the read lock was released
        let Some(entry) = entries.get_mut(key) else {
            return;
        };
        let hits = entry.access_count.load(Ordering::Relaxed);
        if hits > self.settings.popular_threshold
            && promoted > entry.fresh_until
            && promoted <= entry.stale_until
        {
            debug!(
                "Context cache promoting popular entry ({}, {} hits)",
                &key[..12],
                hits
            );
            entry.fresh_until = promoted;
        }
    }

    /// Stale-tier lookup; ignores the fresh deadline and does not count as a hit
    pub fn get_stale(&self, query: &ContextQuery) -> Option<ContextResult> {
        let key = query.cache_key();
        let now = self.clock.now();
        self.read()
            .get(&key)
            .filter(|entry| now < entry.stale_until)
            .map(|entry| entry.value.clone())
    }

    /// Write both tiers from one result; the last writer wins
    pub fn set(&self, query: &ContextQuery, result: ContextResult) {
        let now = self.clock.now();
        let stale_until = now + self.settings.stale_ttl;
        let fresh_until = (now + self.settings.fresh_ttl).min(stale_until);

        self.write().insert(
            query.cache_key(),
            CacheEntry {
                value: result,
                fresh_until,
                stale_until,
                access_count: AtomicU32::new(0),
            },
        );
    }

    pub fn expiry(&self, query: &ContextQuery) -> Option<CacheExpiry> {
        self.read().get(&query.cache_key()).map(|entry| CacheExpiry {
            fresh_until: entry.fresh_until,
            stale_until: entry.stale_until,
            access_count: entry.access_count.load(Ordering::Relaxed),
        })
    }

    /// Drop entries whose stale tier has expired; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|_, entry| now < entry.stale_until);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}
