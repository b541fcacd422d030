//! Store Clients
//!
//! Seams for the two external stores behind the lookup path:
//! - `CacheStore`: key-value store with per-key TTL (Redis)
//! - `DocumentStore`: exact-match lookup over a document collection (MongoDB)
//!
//! In-memory implementations back the tests and local runs.

pub mod memory;
pub mod mongo_store;
pub mod redis_store;

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};

use crate::core::{CacheKey, Payload, Result};

pub use memory::{InMemoryCacheStore, InMemoryDocumentStore};
pub use mongo_store::MongoDocumentStore;
pub use redis_store::RedisCacheStore;

#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    /// Read a raw cached record. `Ok(None)` is a plain miss.
    async fn get(&self, key: &CacheKey) -> Result<Option<String>>;

    /// Write a record that the store expires after `ttl`.
    async fn set_with_ttl(&self, key: &CacheKey, value: String, ttl: Duration) -> Result<()>;

    /// Round trip used by startup and the connection monitor
    async fn ping(&self) -> Result<()>;

    /// Last known connection state. Never touches the network.
    fn is_up(&self) -> bool;
}

#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Exact-match lookup on the identifier field. `Ok(None)` when absent.
    async fn find_by_id(&self, id: &str) -> Result<Option<Payload>>;

    async fn ping(&self) -> Result<()>;

    fn is_up(&self) -> bool;
}

/// Shared up/down flag for one store connection
#[derive(Debug, Clone)]
pub struct ConnectionState {
    store: &'static str,
    up: Arc<AtomicBool>,
}

impl ConnectionState {
    pub fn new(store: &'static str, up: bool) -> Self {
        crate::metrics::set_store_up(store, up);
        Self {
            store,
            up: Arc::new(AtomicBool::new(up)),
        }
    }

    pub fn is_up(&self) -> bool {
        self.up.load(Ordering::Acquire)
    }

    pub fn mark_up(&self) {
        if !self.up.swap(true, Ordering::AcqRel) {
            info!("{} connection restored", self.store);
            crate::metrics::set_store_up(self.store, true);
        }
    }

    pub fn mark_down(&self, reason: &str) {
        if self.up.swap(false, Ordering::AcqRel) {
            warn!("{} connection lost: {}", self.store, reason);
            crate::metrics::set_store_up(self.store, false);
        }
    }
}
