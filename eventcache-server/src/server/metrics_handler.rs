//! Prometheus Metrics HTTP Handler

use axum::{http::StatusCode, response::IntoResponse};

/// GET /metrics - Prometheus metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    match crate::metrics::encode_metrics() {
        Ok(metrics) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            metrics,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", e),
        )
            .into_response(),
    }
}

/// Initialize metrics with default values
pub fn init_metrics() {
    // Force registration so the families show up before the first lookup
    let _ = &*crate::metrics::LOOKUPS_TOTAL;
    let _ = &*crate::metrics::LOOKUP_DURATION;
    let _ = &*crate::metrics::CACHE_POPULATE_TOTAL;
    let _ = &*crate::metrics::STORE_UP;

    tracing::info!("Prometheus metrics initialized (4 metric families registered)");
}
