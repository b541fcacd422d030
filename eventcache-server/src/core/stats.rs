use parking_lot::Mutex;
use serde::Serialize;

use super::types::Provenance;

/// Raw lookup counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatCounters {
    pub total: u64,
    pub hits: u64,
    pub misses: u64,
}

/// Consistent point-in-time view of the counters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub total: u64,
    pub hits: u64,
    pub misses: u64,
    /// Percentage in `[0, 100]`, rounded to two decimals
    pub hit_rate: f64,
}

/// Process-wide hit/miss/total register.
///
/// All three counters live behind a single lock so `snapshot` and `reset`
/// can never observe or produce a torn state.
#[derive(Debug)]
pub struct StatsRegister {
    counters: Mutex<StatCounters>,
    count_errors_as_misses: bool,
}

impl StatsRegister {
    /// `count_errors_as_misses` decides whether `STORE_ERROR` outcomes bump
    /// the miss counter or only the total.
    pub fn new(count_errors_as_misses: bool) -> Self {
        Self {
            counters: Mutex::new(StatCounters::default()),
            count_errors_as_misses,
        }
    }

    pub fn record(&self, outcome: Provenance) {
        let mut counters = self.counters.lock();
        counters.total += 1;
        match outcome {
            Provenance::CacheHit => counters.hits += 1,
            Provenance::StoreHit | Provenance::StoreMiss => counters.misses += 1,
            Provenance::StoreError => {
                if self.count_errors_as_misses {
                    counters.misses += 1;
                }
            }
        }
    }

    pub fn counters(&self) -> StatCounters {
        *self.counters.lock()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let StatCounters {
            total,
            hits,
            misses,
        } = self.counters();

        StatsSnapshot {
            total,
            hits,
            misses,
            hit_rate: hit_rate(hits, total),
        }
    }

    pub fn reset(&self) {
        *self.counters.lock() = StatCounters::default();
    }
}

impl Default for StatsRegister {
    fn default() -> Self {
        Self::new(true)
    }
}

fn hit_rate(hits: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let rate = hits as f64 / total as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_record_classification() {
        let stats = StatsRegister::default();
        stats.record(Provenance::CacheHit);
        stats.record(Provenance::StoreHit);
        stats.record(Provenance::StoreMiss);
        stats.record(Provenance::StoreError);

        let snap = stats.snapshot();
        assert_eq!(snap.total, 4);
        assert_eq!(snap.hits, 1);
        assert_eq!(snap.misses, 3);
        assert_eq!(snap.hit_rate, 25.0);
    }

    #[test]
    fn test_errors_excluded_from_misses() {
        let stats = StatsRegister::new(false);
        stats.record(Provenance::StoreError);
        stats.record(Provenance::StoreMiss);

        let counters = stats.counters();
        assert_eq!(counters.total, 2);
        assert_eq!(counters.misses, 1);
        assert!(counters.hits + counters.misses <= counters.total);
    }

    #[test]
    fn test_hit_rate_rounding() {
        let stats = StatsRegister::default();
        stats.record(Provenance::CacheHit);
        stats.record(Provenance::StoreHit);
        stats.record(Provenance::StoreHit);

        // 1/3 = 33.333...%
        assert_eq!(stats.snapshot().hit_rate, 33.33);
    }

    #[test]
    fn test_empty_register_has_zero_rate() {
        let snap = StatsRegister::default().snapshot();
        assert_eq!(snap.total, 0);
        assert_eq!(snap.hit_rate, 0.0);
    }

    #[test]
    fn test_reset_zeroes_everything() {
        let stats = StatsRegister::default();
        for _ in 0..10 {
            stats.record(Provenance::CacheHit);
            stats.record(Provenance::StoreMiss);
        }
        stats.reset();

        let snap = stats.snapshot();
        assert_eq!(snap.total, 0);
        assert_eq!(snap.hits, 0);
        assert_eq!(snap.misses, 0);
        assert_eq!(snap.hit_rate, 0.0);
    }

    #[test]
    fn test_concurrent_records_are_not_lost() {
        let stats = Arc::new(StatsRegister::default());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let stats = Arc::clone(&stats);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        if i % 2 == 0 {
                            stats.record(Provenance::CacheHit);
                        } else {
                            stats.record(Provenance::StoreHit);
                        }
                        let snap = stats.snapshot();
                        assert!(snap.hits + snap.misses <= snap.total);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let counters = stats.counters();
        assert_eq!(counters.total, 8000);
        assert_eq!(counters.hits, 4000);
        assert_eq!(counters.misses, 4000);
    }
}
