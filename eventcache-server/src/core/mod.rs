pub mod error;
pub mod health;
pub mod lookup;
pub mod stats;
pub mod types;

pub use error::{EventCacheError, Result};
pub use health::{HealthAggregator, HealthReport};
pub use lookup::LookupOrchestrator;
pub use stats::{StatCounters, StatsRegister, StatsSnapshot};
pub use types::{CacheKey, EVENT_KEY_PREFIX, LookupResult, Payload, Provenance};
