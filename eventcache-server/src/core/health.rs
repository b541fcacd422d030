use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::stores::{CacheStore, DocumentStore};

/// Liveness of both store connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub cache_store_up: bool,
    pub persistent_store_up: bool,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.cache_store_up && self.persistent_store_up
    }
}

/// Reads the cached connection flags of both clients
#[derive(Clone)]
pub struct HealthAggregator {
    cache: Arc<dyn CacheStore>,
    documents: Arc<dyn DocumentStore>,
}

impl HealthAggregator {
    pub fn new(cache: Arc<dyn CacheStore>, documents: Arc<dyn DocumentStore>) -> Self {
        Self { cache, documents }
    }

    /// Flag read only, no network round trip
    pub fn health(&self) -> HealthReport {
        HealthReport {
            cache_store_up: self.cache.is_up(),
            persistent_store_up: self.documents.is_up(),
        }
    }

    /// Ping both stores every `interval` so their flags track reality even
    /// without lookup traffic.
    pub fn start_monitor(&self, interval: Duration) -> JoinHandle<()> {
        info!("Starting connection monitor (interval={:?})", interval);

        let cache = Arc::clone(&self.cache);
        let documents = Arc::clone(&self.documents);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let (cache_ping, documents_ping) = tokio::join!(cache.ping(), documents.ping());
                if let Err(e) = cache_ping {
                    debug!("Cache store probe failed: {}", e);
                }
                if let Err(e) = documents_ping {
                    debug!("Document store probe failed: {}", e);
                }
            }
        })
    }
}
