//! Workload generator for the event cache service.
//!
//! Samples event identifiers under a uniform, popularity-weighted or
//! recency-biased distribution and replays them against the cache service
//! at a constant or Poisson arrival rate.

pub mod arrival;
pub mod client;
pub mod driver;
pub mod report;
pub mod sampler;
pub mod score;
pub mod source;

pub use arrival::ArrivalProcess;
pub use client::{CacheServiceClient, OutcomeKind, QueryOutcome};
pub use driver::{Distribution, run_simulation};
pub use report::{RunRecord, RunStats, append_result};
pub use sampler::{IdSampler, Sampler};
pub use score::{EventTraits, popularity_score};
