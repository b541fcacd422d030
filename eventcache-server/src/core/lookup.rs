use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

use super::stats::StatsRegister;
use super::types::{CacheKey, LookupResult, Payload};
use crate::metrics;
use crate::stores::{CacheStore, DocumentStore};

/// Cache-aside lookup over a cache store and a persistent document store.
///
/// `lookup` never fails: every store failure degrades to a provenance value.
/// Concurrent lookups for the same id are independent and may each populate
/// the cache; the payloads are snapshots of the same document.
pub struct LookupOrchestrator {
    cache: Arc<dyn CacheStore>,
    documents: Arc<dyn DocumentStore>,
    stats: Arc<StatsRegister>,
    ttl: Duration,
}

impl LookupOrchestrator {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        documents: Arc<dyn DocumentStore>,
        stats: Arc<StatsRegister>,
        ttl: Duration,
    ) -> Self {
        Self {
            cache,
            documents,
            stats,
            ttl,
        }
    }

    pub fn stats(&self) -> &Arc<StatsRegister> {
        &self.stats
    }

    /// Resolve `event_id` and record the outcome
    pub async fn lookup(&self, event_id: &str) -> LookupResult {
        let started = Instant::now();
        let result = self.resolve(event_id).await;

        self.stats.record(result.provenance());
        metrics::record_lookup(result.provenance(), started.elapsed().as_secs_f64());
        result
    }

    async fn resolve(&self, event_id: &str) -> LookupResult {
        let key = CacheKey::for_event(event_id);

        if !self.cache.is_up() {
            debug!("Cache store down, reading {} from MongoDB directly", event_id);
            return self.from_store(event_id, key).await;
        }

        match self.cache.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<Payload>(&raw) {
                Ok(Payload::Null) => warn!("Discarding null cache entry {}", key),
                Ok(payload) => {
                    debug!("Cache HIT for {}", event_id);
                    return LookupResult::cache_hit(payload);
                }
                Err(e) => warn!("Discarding undecodable cache entry {}: {}", key, e),
            },
            Ok(None) => debug!("Cache MISS for {}", event_id),
            Err(e) => warn!("Cache read failed for {}, falling back: {}", event_id, e),
        }

        self.from_store(event_id, key).await
    }

    async fn from_store(&self, event_id: &str, key: CacheKey) -> LookupResult {
        match self.documents.find_by_id(event_id).await {
            Ok(Some(payload)) => {
                self.populate(key, &payload);
                LookupResult::store_hit(payload)
            }
            Ok(None) => {
                debug!("Event {} not found in MongoDB", event_id);
                LookupResult::store_miss()
            }
            Err(e) => {
                error!("MongoDB lookup failed for {}: {}", event_id, e);
                LookupResult::store_error()
            }
        }
    }

    /// Detached, best-effort write-back. Its outcome never reaches the caller.
    fn populate(&self, key: CacheKey, payload: &Payload) {
        if !self.cache.is_up() {
            return;
        }

        let encoded = match serde_json::to_string(payload) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("Cannot encode {} for caching: {}", key, e);
                metrics::record_populate(false);
                return;
            }
        };

        let cache = Arc::clone(&self.cache);
        let ttl = self.ttl;
        tokio::spawn(async move {
            match cache.set_with_ttl(&key, encoded, ttl).await {
                Ok(()) => {
                    debug!("Cached {} with TTL {}s", key, ttl.as_secs());
                    metrics::record_populate(true);
                }
                Err(e) => {
                    warn!("Failed to cache {}: {}", key, e);
                    metrics::record_populate(false);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Provenance;
    use crate::stores::{InMemoryCacheStore, InMemoryDocumentStore};
    use serde_json::json;

    struct Fixture {
        cache: Arc<InMemoryCacheStore>,
        documents: Arc<InMemoryDocumentStore>,
        orchestrator: LookupOrchestrator,
    }

    fn fixture(ttl_secs: u64) -> Fixture {
        let cache = Arc::new(InMemoryCacheStore::new());
        let documents = Arc::new(InMemoryDocumentStore::new());
        let orchestrator = LookupOrchestrator::new(
            cache.clone(),
            documents.clone(),
            Arc::new(StatsRegister::default()),
            Duration::from_secs(ttl_secs),
        );
        Fixture {
            cache,
            documents,
            orchestrator,
        }
    }

    /// Let detached populate tasks run
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_hit_then_cache_hit_then_expiry() {
        let fx = fixture(60);
        let payload = json!({"uuid": "abc-123", "type": "JAM"});
        fx.documents.insert("abc-123", payload.clone());

        let first = fx.orchestrator.lookup("abc-123").await;
        assert_eq!(first.provenance(), Provenance::StoreHit);
        assert_eq!(first.payload(), Some(&payload));
        settle().await;

        tokio::time::advance(Duration::from_secs(10)).await;
        let second = fx.orchestrator.lookup("abc-123").await;
        assert_eq!(second.provenance(), Provenance::CacheHit);
        assert_eq!(second.payload(), Some(&payload));

        tokio::time::advance(Duration::from_secs(51)).await;
        let third = fx.orchestrator.lookup("abc-123").await;
        assert_eq!(third.provenance(), Provenance::StoreHit);

        let counters = fx.orchestrator.stats().counters();
        assert_eq!((counters.total, counters.hits, counters.misses), (3, 1, 2));
    }

    #[tokio::test]
    async fn test_absent_id_is_store_miss_and_not_cached() {
        let fx = fixture(60);

        let result = fx.orchestrator.lookup("missing").await;
        settle().await;

        assert_eq!(result.provenance(), Provenance::StoreMiss);
        assert!(result.payload().is_none());
        assert_eq!(fx.cache.writes(), 0);
    }

    #[tokio::test]
    async fn test_cache_down_bypasses_cache() {
        let fx = fixture(60);
        fx.documents.insert("x", json!({"uuid": "x"}));
        fx.cache.set_available(false);

        let result = fx.orchestrator.lookup("x").await;
        settle().await;

        assert_eq!(result.provenance(), Provenance::StoreHit);
        assert_eq!(fx.cache.writes(), 0);
    }

    #[tokio::test]
    async fn test_cache_read_error_falls_through_to_store() {
        let fx = fixture(60);
        fx.documents.insert("x", json!({"uuid": "x"}));
        fx.cache.set_read_failures(true);

        let hit = fx.orchestrator.lookup("x").await;
        assert_eq!(hit.provenance(), Provenance::StoreHit);

        let miss = fx.orchestrator.lookup("y").await;
        assert_eq!(miss.provenance(), Provenance::StoreMiss);
    }

    #[tokio::test]
    async fn test_store_failure_is_store_error() {
        let fx = fixture(60);
        fx.documents.insert("x", json!({"uuid": "x"}));
        fx.documents.set_failing(true);

        let result = fx.orchestrator.lookup("x").await;
        assert_eq!(result.provenance(), Provenance::StoreError);
        assert!(result.payload().is_none());
    }

    #[tokio::test]
    async fn test_undecodable_cache_entry_falls_back() {
        let fx = fixture(60);
        fx.documents.insert("x", json!({"uuid": "x"}));
        fx.cache
            .set_with_ttl(
                &CacheKey::for_event("x"),
                "not json".to_string(),
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        let result = fx.orchestrator.lookup("x").await;
        assert_eq!(result.provenance(), Provenance::StoreHit);
    }

    #[tokio::test]
    async fn test_null_cache_entry_falls_back() {
        let fx = fixture(60);
        let payload = json!({"uuid": "n", "type": "JAM"});
        fx.documents.insert("n", payload.clone());
        fx.cache
            .set_with_ttl(
                &CacheKey::for_event("n"),
                "null".to_string(),
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        let result = fx.orchestrator.lookup("n").await;
        assert_eq!(result.provenance(), Provenance::StoreHit);
        assert_eq!(result.payload(), Some(&payload));
    }

    #[tokio::test]
    async fn test_failed_populate_does_not_affect_lookup() {
        let fx = fixture(60);
        let payload = json!({"uuid": "w", "type": "ACCIDENT"});
        fx.documents.insert("w", payload.clone());
        fx.cache.set_write_failures(true);

        let failures = || {
            metrics::CACHE_POPULATE_TOTAL
                .with_label_values(&["failure"])
                .get()
        };
        let failures_before = failures();

        let first = fx.orchestrator.lookup("w").await;
        assert_eq!(first.provenance(), Provenance::StoreHit);
        assert_eq!(first.payload(), Some(&payload));
        settle().await;

        assert!(failures() > failures_before);
        assert_eq!(fx.cache.writes(), 0);
        assert!(fx.cache.is_up());

        let second = fx.orchestrator.lookup("w").await;
        assert_eq!(second.provenance(), Provenance::StoreHit);
        assert_eq!(second.payload(), Some(&payload));
    }

    #[tokio::test]
    async fn test_concurrent_lookups_for_absent_id() {
        let fx = fixture(60);
        let orchestrator = Arc::new(fx.orchestrator);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let orchestrator = Arc::clone(&orchestrator);
                tokio::spawn(async move { orchestrator.lookup("ghost").await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().provenance(), Provenance::StoreMiss);
        }
        settle().await;

        assert_eq!(fx.cache.writes(), 0);
        assert_eq!(fx.documents.queries(), 16);
        assert_eq!(orchestrator.stats().counters().total, 16);
    }
}
