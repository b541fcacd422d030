pub mod config;
pub mod core;
pub mod metrics;
pub mod server;
pub mod stores;

// Re-export commonly used types
pub use config::ServerConfig;
pub use core::{
    CacheKey, EventCacheError, HealthAggregator, HealthReport, LookupOrchestrator, LookupResult,
    Payload, Provenance, StatsRegister, StatsSnapshot,
};
pub use server::{AppState, CACHE_STATUS_HEADER, create_router, init_metrics};
pub use stores::{
    CacheStore, DocumentStore, InMemoryCacheStore, InMemoryDocumentStore, MongoDocumentStore,
    RedisCacheStore,
};
