//! Prometheus Metrics for EventCache
//!
//! - Lookups by provenance and their latency
//! - Best-effort cache populate outcomes
//! - Store connection state

use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramVec, IntCounterVec, IntGaugeVec, TextEncoder, register_histogram_vec,
    register_int_counter_vec, register_int_gauge_vec,
};

use crate::core::Provenance;

lazy_static! {
    /// Total lookups by provenance (CACHE_HIT, STORE_HIT, STORE_MISS, STORE_ERROR)
    pub static ref LOOKUPS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "eventcache_lookups_total",
        "Total number of event lookups by provenance",
        &["provenance"]
    ).unwrap();

    /// Lookup latency in seconds
    pub static ref LOOKUP_DURATION: HistogramVec = register_histogram_vec!(
        "eventcache_lookup_duration_seconds",
        "Event lookup latency in seconds",
        &["provenance"],
        vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]
    ).unwrap();

    /// Cache write-backs after a store hit
    pub static ref CACHE_POPULATE_TOTAL: IntCounterVec = register_int_counter_vec!(
        "eventcache_cache_populate_total",
        "Cache populate attempts after a store hit",
        &["status"]
    ).unwrap();

    /// 1 when the store connection is believed up
    pub static ref STORE_UP: IntGaugeVec = register_int_gauge_vec!(
        "eventcache_store_up",
        "Connection state per store (1 = up)",
        &["store"]
    ).unwrap();
}

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record a finished lookup
pub fn record_lookup(provenance: Provenance, duration_secs: f64) {
    LOOKUPS_TOTAL
        .with_label_values(&[provenance.as_str()])
        .inc();
    LOOKUP_DURATION
        .with_label_values(&[provenance.as_str()])
        .observe(duration_secs);
}

/// Record a cache populate outcome
pub fn record_populate(success: bool) {
    let status = if success { "success" } else { "failure" };
    CACHE_POPULATE_TOTAL.with_label_values(&[status]).inc();
}

pub fn set_store_up(store: &str, up: bool) {
    STORE_UP.with_label_values(&[store]).set(i64::from(up));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_lookup() {
        record_lookup(Provenance::CacheHit, 0.0004);
        record_lookup(Provenance::StoreMiss, 0.003);

        let metrics = encode_metrics().unwrap();
        assert!(metrics.contains("eventcache_lookups_total"));
        assert!(metrics.contains("eventcache_lookup_duration_seconds"));
        assert!(metrics.contains("CACHE_HIT"));
    }

    #[test]
    fn test_store_up_gauge() {
        set_store_up("gauge-test", false);
        assert_eq!(STORE_UP.with_label_values(&["gauge-test"]).get(), 0);

        set_store_up("gauge-test", true);
        assert_eq!(STORE_UP.with_label_values(&["gauge-test"]).get(), 1);
    }
}
