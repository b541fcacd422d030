//! In-memory store implementations with fault injection

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::{CacheStore, ConnectionState, DocumentStore};
use crate::core::{CacheKey, EventCacheError, Payload, Result};

struct CachedEntry {
    value: String,
    expires_at: Instant,
}

/// TTL-honouring cache store held in process memory.
///
/// Expiry is measured with `tokio::time::Instant`, so paused test clocks
/// drive it deterministically.
pub struct InMemoryCacheStore {
    entries: Mutex<HashMap<String, CachedEntry>>,
    state: ConnectionState,
    read_failures: AtomicBool,
    write_failures: AtomicBool,
    writes: AtomicU64,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            state: ConnectionState::new("memory-cache", true),
            read_failures: AtomicBool::new(false),
            write_failures: AtomicBool::new(false),
            writes: AtomicU64::new(0),
        }
    }

    /// Simulate the connection closing or coming back
    pub fn set_available(&self, available: bool) {
        if available {
            self.state.mark_up();
        } else {
            self.state.mark_down("simulated outage");
        }
    }

    /// Make reads fail while the connection flag stays up
    pub fn set_read_failures(&self, failing: bool) {
        self.read_failures.store(failing, Ordering::Release);
    }

    /// Make writes fail while reads keep working
    pub fn set_write_failures(&self, failing: bool) {
        self.write_failures.store(failing, Ordering::Release);
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        let entries = self.entries.lock();
        entries
            .get(key.as_str())
            .is_some_and(|entry| entry.expires_at > Instant::now())
    }

    /// Number of successful `set_with_ttl` calls
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Acquire)
    }

    fn ensure_available(&self) -> Result<()> {
        if self.state.is_up() {
            Ok(())
        } else {
            Err(EventCacheError::CacheUnavailable(
                "connection is closed".to_string(),
            ))
        }
    }
}

impl Default for InMemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>> {
        self.ensure_available()?;
        if self.read_failures.load(Ordering::Acquire) {
            return Err(EventCacheError::CacheUnavailable(
                "simulated read failure".to_string(),
            ));
        }

        let mut entries = self.entries.lock();
        let expired = match entries.get(key.as_str()) {
            Some(entry) if entry.expires_at > Instant::now() => {
                return Ok(Some(entry.value.clone()));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.remove(key.as_str());
            debug!("memory cache expired key={}", key);
        }
        Ok(None)
    }

    async fn set_with_ttl(&self, key: &CacheKey, value: String, ttl: Duration) -> Result<()> {
        self.ensure_available()
            .map_err(|e| EventCacheError::CachePopulateFailed(e.to_string()))?;
        if self.write_failures.load(Ordering::Acquire) {
            return Err(EventCacheError::CachePopulateFailed(
                "simulated write failure".to_string(),
            ));
        }

        self.entries.lock().insert(
            key.as_str().to_string(),
            CachedEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        self.writes.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.ensure_available()
    }

    fn is_up(&self) -> bool {
        self.state.is_up()
    }
}

/// Document collection keyed by identifier
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<String, Payload>>,
    state: ConnectionState,
    failing: AtomicBool,
    latency: Mutex<Option<Duration>>,
    queries: AtomicU64,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            state: ConnectionState::new("memory-documents", true),
            failing: AtomicBool::new(false),
            latency: Mutex::new(None),
            queries: AtomicU64::new(0),
        }
    }

    pub fn insert(&self, id: impl Into<String>, payload: Payload) {
        self.documents.write().insert(id.into(), payload);
    }

    /// Make every query fail as if the driver raised
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Release);
    }

    /// Delay every query by `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    /// Number of `find_by_id` calls served so far
    pub fn queries(&self) -> u64 {
        self.queries.load(Ordering::Acquire)
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Payload>> {
        self.queries.fetch_add(1, Ordering::AcqRel);

        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if self.failing.load(Ordering::Acquire) {
            return Err(EventCacheError::PersistentStore(
                "simulated query failure".to_string(),
            ));
        }

        Ok(self.documents.read().get(id).cloned())
    }

    async fn ping(&self) -> Result<()> {
        if self.failing.load(Ordering::Acquire) {
            self.state.mark_down("simulated outage");
            return Err(EventCacheError::PersistentStore(
                "simulated outage".to_string(),
            ));
        }
        self.state.mark_up();
        Ok(())
    }

    fn is_up(&self) -> bool {
        self.state.is_up()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn test_memory_cache_ttl_expiry() {
        let cache = InMemoryCacheStore::new();
        let key = CacheKey::for_event("abc");

        cache
            .set_with_ttl(&key, "\"payload\"".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some("\"payload\""));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(cache.get(&key).await.unwrap().is_none());
        assert!(!cache.contains(&key));
    }

    #[tokio::test]
    async fn test_memory_cache_outage() {
        let cache = InMemoryCacheStore::new();
        cache.set_available(false);

        assert!(!cache.is_up());
        assert!(cache.get(&CacheKey::for_event("x")).await.is_err());
        assert!(cache.ping().await.is_err());

        cache.set_available(true);
        assert!(cache.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_memory_cache_write_failures() {
        let cache = InMemoryCacheStore::new();
        let key = CacheKey::for_event("w");
        cache.set_write_failures(true);

        let err = cache
            .set_with_ttl(&key, "{}".to_string(), Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(err, EventCacheError::CachePopulateFailed(_)));
        assert_eq!(cache.writes(), 0);
        assert!(cache.get(&key).await.unwrap().is_none());
        assert!(cache.is_up());
    }

    #[tokio::test]
    async fn test_memory_documents_lookup_and_failure() {
        let store = InMemoryDocumentStore::new();
        store.insert("x", json!({"uuid": "x"}));

        assert_eq!(store.find_by_id("x").await.unwrap(), Some(json!({"uuid": "x"})));
        assert_eq!(store.find_by_id("y").await.unwrap(), None);

        store.set_failing(true);
        assert!(store.find_by_id("x").await.is_err());
        assert_eq!(store.queries(), 3);
    }
}
