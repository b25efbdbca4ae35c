//! HTTP routes for Relaygate
//!
//! A small status and control surface over the relay registry.

pub mod health;
pub mod metrics;
pub mod relays;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::AppState;

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // A refresh waits for every probe, each bounded by the probe timeout
    let request_timeout = state.config.probe_timeout() + Duration::from_secs(5);

    let relay_routes = Router::new()
        .route("/relays", get(relays::list_relays))
        .route("/relays/refresh", post(relays::refresh_relays))
        .route("/relays/reset", post(relays::reset_relays))
        .route("/relays/unhealthy", post(relays::mark_unhealthy))
        .route("/relays/transform", post(relays::transform));

    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness_check))
        .route("/metrics", get(metrics::prometheus_metrics));

    Router::new()
        .merge(public_routes)
        .merge(relay_routes)
        // Global middleware (applied to all routes)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
