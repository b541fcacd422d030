//! Simulation loop

use clap::ValueEnum;
use rand::Rng;
use tracing::{info, warn};

use crate::arrival::ArrivalProcess;
use crate::client::CacheServiceClient;
use crate::report::RunStats;
use crate::sampler::{IdSampler, RecencySampler, Sampler, UniformSampler, WeightedSampler};
use crate::score::{EventTraits, popularity_score};

/// How identifiers are chosen for each request
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Distribution {
    Uniform,
    Popularity,
    Recency,
}

impl Distribution {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Uniform => "uniform",
            Self::Popularity => "popularity",
            Self::Recency => "recency",
        }
    }

    /// Events to sample for a run of `total_queries`
    pub fn pool_size(&self, total_queries: u64) -> usize {
        let total = usize::try_from(total_queries).unwrap_or(usize::MAX);
        match self {
            Self::Uniform | Self::Recency => total.saturating_mul(2).min(5000),
            Self::Popularity => total.saturating_mul(5).min(10_000),
        }
    }

    pub fn build_sampler(&self, events: &[EventTraits], window: usize, bias: f64) -> Sampler {
        let ids = || events.iter().filter_map(|e| e.uuid.clone()).collect::<Vec<_>>();
        match self {
            Self::Uniform => Sampler::Uniform(UniformSampler::new(ids())),
            Self::Recency => Sampler::Recency(RecencySampler::new(ids(), window, bias)),
            Self::Popularity => Sampler::Weighted(WeightedSampler::new(
                events
                    .iter()
                    .filter_map(|e| e.uuid.clone().map(|id| (id, popularity_score(e)))),
            )),
        }
    }
}

/// Send `total` sequential lookups spaced by `arrival`.
///
/// Stops early when the sampler runs dry.
pub async fn run_simulation<R: Rng + ?Sized>(
    client: &CacheServiceClient,
    sampler: &mut Sampler,
    arrival: ArrivalProcess,
    total: u64,
    rng: &mut R,
) -> RunStats {
    info!("Starting {} simulation of {} queries", arrival.name(), total);
    let mut stats = RunStats::default();

    while stats.total < total {
        let Some(event_id) = sampler.next_id(rng) else {
            warn!("Event pool is empty, ending simulation early");
            break;
        };

        let outcome = client.query(&event_id).await;
        stats.record(&outcome);

        if stats.total % 100 == 0 || stats.total == total {
            info!("Progress ({}): {}/{}", arrival.name(), stats.total, total);
        }

        if stats.total < total {
            tokio::time::sleep(arrival.next_delay(rng)).await;
        }
    }

    info!(
        "{} finished: {} queries, {} hits, {} misses, {} errors, hit rate {:.2}%, avg latency {:.2}ms",
        arrival.name(),
        stats.total,
        stats.hits,
        stats.misses,
        stats.errors,
        stats.hit_rate(),
        stats.avg_latency_ms()
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str, kind: &str) -> EventTraits {
        EventTraits {
            uuid: Some(id.to_string()),
            kind: Some(kind.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_pool_sizes() {
        assert_eq!(Distribution::Uniform.pool_size(1000), 2000);
        assert_eq!(Distribution::Recency.pool_size(10_000), 5000);
        assert_eq!(Distribution::Popularity.pool_size(1000), 5000);
        assert_eq!(Distribution::Popularity.pool_size(1_000_000), 10_000);
    }

    #[test]
    fn test_build_sampler_variants() {
        let events = vec![event("a", "ROAD_CLOSED"), event("b", "POLICE"), EventTraits::default()];

        match Distribution::Popularity.build_sampler(&events, 50, 0.8) {
            Sampler::Weighted(sampler) => {
                assert_eq!(sampler.len(), 2);
                assert_eq!(sampler.total_weight(), 501);
            }
            other => panic!("unexpected sampler {:?}", other),
        }
        assert!(matches!(
            Distribution::Uniform.build_sampler(&events, 50, 0.8),
            Sampler::Uniform(_)
        ));
        assert!(matches!(
            Distribution::Recency.build_sampler(&events, 50, 0.8),
            Sampler::Recency(_)
        ));
    }
}
