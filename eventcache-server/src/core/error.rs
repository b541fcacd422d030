use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Main error type for EventCache operations
#[derive(Debug, Error)]
pub enum EventCacheError {
    /// Cache connection closed or a cache call failed. Lookups fall back to
    /// the persistent store.
    #[error("Cache store unavailable: {0}")]
    CacheUnavailable(String),

    /// Writing a record back into the cache failed. Logged only.
    #[error("Cache populate failed: {0}")]
    CachePopulateFailed(String),

    /// Query failure or not-ready connection on the persistent store.
    #[error("Persistent store error: {0}")]
    PersistentStore(String),

    #[error("Failed to connect to {store} at startup: {reason}")]
    StartupConnect { store: &'static str, reason: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Event {0} not found")]
    EventNotFound(String),

    #[error("Lookup for {0} timed out")]
    LookupTimeout(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EventCacheError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::EventNotFound(_) => StatusCode::NOT_FOUND,
            Self::CacheUnavailable(_)
            | Self::CachePopulateFailed(_)
            | Self::PersistentStore(_)
            | Self::StartupConnect { .. }
            | Self::LookupTimeout(_)
            | Self::Serialization(_)
            | Self::Config(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<serde_json::Error> for EventCacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Implement IntoResponse for Axum integration
impl IntoResponse for EventCacheError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
            "code": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

/// Result type alias for EventCache operations
pub type Result<T> = std::result::Result<T, EventCacheError>;
