use crate::config::ServerConfig;
use crate::core::{
    EventCacheError, HealthAggregator, LookupOrchestrator, Provenance, StatsRegister,
};
use crate::stores::{CacheStore, DocumentStore};
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderName, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Response header reporting whether the payload came from the cache
pub const CACHE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-cache-status");

/// Cache status reported for every response not served from the cache
const CACHE_MISS: &str = "MISS";

/// Longest identifier accepted by `/event/{id}`, in bytes
pub const MAX_EVENT_ID_LEN: usize = 256;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<LookupOrchestrator>,
    pub health: HealthAggregator,
    pub lookup_timeout: Duration,
}

impl AppState {
    /// Wire the lookup path over already-connected stores
    pub fn new(
        cache: Arc<dyn CacheStore>,
        documents: Arc<dyn DocumentStore>,
        config: &ServerConfig,
    ) -> Self {
        let stats = Arc::new(StatsRegister::new(config.stats.count_errors_as_misses));
        let orchestrator = Arc::new(LookupOrchestrator::new(
            Arc::clone(&cache),
            Arc::clone(&documents),
            stats,
            config.cache_ttl(),
        ));

        Self {
            orchestrator,
            health: HealthAggregator::new(cache, documents),
            lookup_timeout: config.lookup_timeout(),
        }
    }

    pub fn stats(&self) -> &Arc<StatsRegister> {
        self.orchestrator.stats()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_requests: u64,
    pub hit_count: u64,
    pub miss_count: u64,
    /// Two-decimal percentage followed by `%`
    pub hit_rate: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub cache_store_status: &'static str,
    pub persistent_store_status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Reject identifiers that cannot name an event
pub fn validate_event_id(raw: &str) -> Result<&str, EventCacheError> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(EventCacheError::InvalidRequest(
            "Event ID is required".to_string(),
        ));
    }
    if id.len() > MAX_EVENT_ID_LEN {
        return Err(EventCacheError::InvalidRequest(format!(
            "Event ID exceeds {} bytes",
            MAX_EVENT_ID_LEN
        )));
    }
    if id.chars().any(char::is_control) {
        return Err(EventCacheError::InvalidRequest(
            "Event ID contains control characters".to_string(),
        ));
    }
    Ok(id)
}

/// GET /event/{id} - cache-aside event lookup
///
/// Every response carries `x-cache-status`; anything not served from the
/// cache reports `MISS`.
pub async fn get_event(State(state): State<AppState>, Path(raw_id): Path<String>) -> Response {
    debug!("REST GET event={}", raw_id);
    let event_id = match validate_event_id(&raw_id) {
        Ok(id) => id.to_string(),
        Err(err) => return error_response(err),
    };

    // The lookup runs as its own task so a timed-out request still lets the
    // stores answer and the outcome still gets counted.
    let orchestrator = Arc::clone(&state.orchestrator);
    let lookup_id = event_id.clone();
    let task = tokio::spawn(async move { orchestrator.lookup(&lookup_id).await });

    let result = match tokio::time::timeout(state.lookup_timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            let err = EventCacheError::Internal(format!("lookup task failed: {}", e));
            return error_response(err);
        }
        Err(_) => {
            warn!(
                "Lookup for {} exceeded {:?}, discarding late result",
                event_id, state.lookup_timeout
            );
            let err = EventCacheError::LookupTimeout(event_id);
            return error_response(err);
        }
    };

    let provenance = result.provenance();
    match (provenance, result.into_payload()) {
        (Provenance::CacheHit | Provenance::StoreHit, Some(payload)) => (
            StatusCode::OK,
            [(CACHE_STATUS_HEADER, provenance.cache_status())],
            Json(payload),
        )
            .into_response(),
        (Provenance::StoreMiss, _) => error_response(EventCacheError::EventNotFound(event_id)),
        _ => {
            let err = EventCacheError::PersistentStore(format!("lookup for {} failed", event_id));
            error_response(err)
        }
    }
}

fn error_response(err: EventCacheError) -> Response {
    let status = err.status_code();
    let body = Json(json!({
        "error": err.to_string(),
        "code": status.as_u16(),
    }));
    (status, [(CACHE_STATUS_HEADER, CACHE_MISS)], body).into_response()
}

/// GET /stats - hit/miss counters snapshot
pub async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let snapshot = state.stats().snapshot();
    Json(StatsResponse {
        total_requests: snapshot.total,
        hit_count: snapshot.hits,
        miss_count: snapshot.misses,
        hit_rate: format!("{:.2}%", snapshot.hit_rate),
    })
}

/// POST /reset-stats - zero all counters
pub async fn reset_stats(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.stats().reset();
    info!("Statistics reset");
    Json(json!({
        "success": true,
        "message": "Stats reset."
    }))
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let report = state.health.health();
    let status_of = |up: bool| if up { "OK" } else { "Error" };

    Json(HealthResponse {
        status: if report.is_healthy() { "OK" } else { "DEGRADED" },
        cache_store_status: status_of(report.cache_store_up),
        persistent_store_status: status_of(report.persistent_store_up),
        service: "eventcache",
        version: env!("CARGO_PKG_VERSION"),
    })
}
