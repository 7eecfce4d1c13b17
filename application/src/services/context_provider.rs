//! Cache-first retrieval with graceful degradation.
//!
//! ```text
//! fetch ─▶ fresh cache ─hit─▶ FreshCache
//!            │miss
//!            ▼
//!          breaker "rag-query" ─ok─▶ write-through ─▶ Live
//!            │open / error / timeout (4xx rejections do not trip it)
//!            ▼
//!          stale cache ─hit─▶ StaleCache
//!            │miss
//!            ▼
//!          Unavailable (empty result, never an error)
//! ```

use super::circuit_breaker::{CallFailure, CircuitBreakerRegistry};
use super::context_cache::ContextCache;
use crate::ports::retrieval::{RetrievalError, RetrievalPort};
use council_domain::{ContextOrigin, ContextQuery, ContextResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Circuit name guarding the retrieval service
pub const RETRIEVAL_BREAKER: &str = "rag-query";

/// Context plus where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct ContextFetch {
    pub result: ContextResult,
    pub origin: ContextOrigin,
}

impl ContextFetch {
    fn new(result: ContextResult, origin: ContextOrigin) -> Self {
        Self { result, origin }
    }
}

pub struct ContextProvider {
    retrieval: Arc<dyn RetrievalPort>,
    cache: Arc<ContextCache>,
    breakers: Arc<CircuitBreakerRegistry>,
    timeout: Duration,
}

impl ContextProvider {
    pub fn new(
        retrieval: Arc<dyn RetrievalPort>,
        cache: Arc<ContextCache>,
        breakers: Arc<CircuitBreakerRegistry>,
        timeout: Duration,
    ) -> Self {
        Self {
            retrieval,
            cache,
            breakers,
            timeout,
        }
    }

    pub fn cache(&self) -> &ContextCache {
        &self.cache
    }

    /// Fetch context for `query`. Never fails; degraded paths are reported
    /// through [`ContextFetch::origin`].
    pub async fn fetch(&self, query: &ContextQuery) -> ContextFetch {
        if let Some(hit) = self.cache.get(query) {
            return ContextFetch::new(hit, ContextOrigin::FreshCache);
        }

        let retrieval = &self.retrieval;
        let cache = &self.cache;
        self.breakers
            .execute_classified(
                RETRIEVAL_BREAKER,
                self.timeout,
                |e: &RetrievalError| !e.is_client_error(),
                || async move {
                    let result = retrieval.query(query).await?;
                    if let Some(error) = &result.error {
                        return Err(RetrievalError::Upstream(error.clone()));
                    }
                    if result.is_cacheable() {
                        cache.set(query, result.clone());
                    } else {
                        debug!("Retrieval returned no chunks; not caching");
                    }
                    Ok(ContextFetch::new(result, ContextOrigin::Live))
                },
                |failure| self.degrade(query, failure),
            )
            .await
    }

    fn degrade(&self, query: &ContextQuery, failure: CallFailure<RetrievalError>) -> ContextFetch {
        match self.cache.get_stale(query) {
            Some(stale) => {
                warn!("Retrieval degraded ({}); serving stale context", failure);
                ContextFetch::new(stale, ContextOrigin::StaleCache)
            }
            None => {
                warn!("Retrieval degraded ({}); no context available", failure);
                ContextFetch::new(
                    ContextResult::unavailable(format!("retrieval unavailable: {}", failure)),
                    ContextOrigin::Unavailable,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheSettings;
    use crate::ports::clock::ManualClock;
    use async_trait::async_trait;
    use council_domain::{BreakerPolicy, CircuitState, SourceRef};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Scripted {
        Hit(ContextResult),
        Error(RetrievalError),
        Hang,
    }

    /// Retrieval port that replays a queue of scripted answers
    struct ScriptedRetrieval {
        script: Mutex<VecDeque<Scripted>>,
        calls: AtomicUsize,
    }

    impl ScriptedRetrieval {
        fn new(script: Vec<Scripted>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RetrievalPort for ScriptedRetrieval {
        async fn query(&self, _query: &ContextQuery) -> Result<ContextResult, RetrievalError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Scripted::Hit(result)) => Ok(result),
                Some(Scripted::Error(e)) => Err(e),
                Some(Scripted::Hang) => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Err(RetrievalError::Transport("hung".into()))
                }
                None => Err(RetrievalError::Transport("script exhausted".into())),
            }
        }
    }

    struct Fixture {
        provider: ContextProvider,
        retrieval: Arc<ScriptedRetrieval>,
        clock: Arc<ManualClock>,
        breakers: Arc<CircuitBreakerRegistry>,
    }

    fn fixture(script: Vec<Scripted>, threshold: u32) -> Fixture {
        let clock = Arc::new(ManualClock::new());
        let retrieval = Arc::new(ScriptedRetrieval::new(script));
        let cache = Arc::new(ContextCache::new(CacheSettings::default(), clock.clone()));
        let policy = BreakerPolicy {
            failure_threshold: threshold,
            ..BreakerPolicy::default()
        };
        let breakers = Arc::new(CircuitBreakerRegistry::new(policy, clock.clone()));
        let provider = ContextProvider::new(
            retrieval.clone(),
            cache,
            breakers.clone(),
            Duration::from_millis(50),
        );
        Fixture {
            provider,
            retrieval,
            clock,
            breakers,
        }
    }

    fn query() -> ContextQuery {
        ContextQuery::new("GDPR obligations for patient data", "legal", "healthtech")
    }

    fn hit() -> ContextResult {
        ContextResult::new(
            "Article 9 covers health data.",
            vec![SourceRef::new("f9", "gdpr.pdf", 0.82, 4)],
        )
    }

    #[tokio::test]
    async fn test_live_then_fresh_cache() {
        let f = fixture(vec![Scripted::Hit(hit())], 5);

        let first = f.provider.fetch(&query()).await;
        assert_eq!(first.origin, ContextOrigin::Live);
        assert_eq!(first.result, hit());

        let second = f.provider.fetch(&query()).await;
        assert_eq!(second.origin, ContextOrigin::FreshCache);
        assert_eq!(f.retrieval.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_results_not_cached() {
        let f = fixture(
            vec![
                Scripted::Hit(ContextResult::default()),
                Scripted::Hit(hit()),
            ],
            5,
        );
        assert_eq!(f.provider.fetch(&query()).await.origin, ContextOrigin::Live);
        assert_eq!(f.provider.fetch(&query()).await.origin, ContextOrigin::Live);
        assert_eq!(f.retrieval.calls(), 2);
    }

    #[tokio::test]
    async fn test_error_marker_serves_stale() {
        let f = fixture(
            vec![
                Scripted::Hit(hit()),
                Scripted::Hit(ContextResult::unavailable("index offline")),
            ],
            5,
        );
        f.provider.fetch(&query()).await;
        f.clock.advance(Duration::from_secs(31 * 60));

        let fetched = f.provider.fetch(&query()).await;
        assert_eq!(fetched.origin, ContextOrigin::StaleCache);
        assert_eq!(fetched.result, hit());
    }

    #[tokio::test]
    async fn test_unavailable_when_nothing_cached() {
        let f = fixture(
            vec![Scripted::Error(RetrievalError::Status {
                status: 503,
                body: "down".into(),
            })],
            5,
        );
        let fetched = f.provider.fetch(&query()).await;
        assert_eq!(fetched.origin, ContextOrigin::Unavailable);
        assert!(fetched.result.is_empty());
        assert!(fetched.result.error.is_some());
    }

    #[tokio::test]
    async fn test_timeout_degrades() {
        let f = fixture(vec![Scripted::Hang], 5);
        let fetched = f.provider.fetch(&query()).await;
        assert_eq!(fetched.origin, ContextOrigin::Unavailable);
    }

    #[tokio::test]
    async fn test_open_circuit_skips_retrieval() {
        let f = fixture(
            vec![
                Scripted::Error(RetrievalError::Transport("refused".into())),
                Scripted::Error(RetrievalError::Transport("refused".into())),
            ],
            2,
        );
        f.provider.fetch(&query()).await;
        f.provider.fetch(&query()).await;
        assert_eq!(f.breakers.state(RETRIEVAL_BREAKER), CircuitState::Open);

        let fetched = f.provider.fetch(&query()).await;
        assert_eq!(fetched.origin, ContextOrigin::Unavailable);
        assert_eq!(f.retrieval.calls(), 2);
    }

    #[tokio::test]
    async fn test_rejected_filters_do_not_open_circuit() {
        let rejected = || {
            Scripted::Error(RetrievalError::Status {
                status: 422,
                body: "sector: value is not a valid enumeration member".into(),
            })
        };
        let mut script: Vec<Scripted> = (0..5).map(|_| rejected()).collect();
        script.push(Scripted::Hit(hit()));
        let f = fixture(script, 2);

        let biotech = ContextQuery::new("GDPR obligations for patient data", "legal", "biotech");
        for _ in 0..5 {
            let fetched = f.provider.fetch(&biotech).await;
            assert_eq!(fetched.origin, ContextOrigin::Unavailable);
        }
        assert_eq!(f.breakers.state(RETRIEVAL_BREAKER), CircuitState::Closed);

        let fetched = f.provider.fetch(&query()).await;
        assert_eq!(fetched.origin, ContextOrigin::Live);
        assert_eq!(f.retrieval.calls(), 6);
    }

    #[tokio::test]
    async fn test_rate_limiting_counts_as_failure() {
        let limited = || {
            Scripted::Error(RetrievalError::Status {
                status: 429,
                body: "slow down".into(),
            })
        };
        let f = fixture(vec![limited(), limited()], 2);
        f.provider.fetch(&query()).await;
        f.provider.fetch(&query()).await;
        assert_eq!(f.breakers.state(RETRIEVAL_BREAKER), CircuitState::Open);
    }
}
