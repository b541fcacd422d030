use super::handlers::{self, AppState};
use super::metrics_handler::metrics_handler;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the Axum router with all endpoints
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/event/{id}", get(handlers::get_event))
        .route("/stats", get(handlers::get_stats))
        // GET kept for older benchmark scripts
        .route(
            "/reset-stats",
            post(handlers::reset_stats).get(handlers::reset_stats),
        )
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
