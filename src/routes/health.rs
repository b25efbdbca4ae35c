//! Health check endpoints
//!
//! - `/health` - Overall status derived from relay health flags
//! - `/health/live` - Liveness probe

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;

/// Health status enum
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Relay counts behind the overall status
#[derive(Debug, Serialize)]
pub struct RelayCounts {
    pub total: usize,
    pub healthy: usize,
}

/// Full health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: String,
    pub relays: RelayCounts,
}

/// Simple health response for liveness
#[derive(Debug, Serialize)]
pub struct SimpleHealthResponse {
    pub status: HealthStatus,
}

/// Overall status for `healthy` out of `total` relays
pub fn overall_status(healthy: usize, total: usize) -> HealthStatus {
    if healthy == 0 {
        HealthStatus::Unhealthy
    } else if healthy < total {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

/// Full health check endpoint
///
/// Uses the current relay flags; it does not probe.
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let relays = state.registry.snapshot();
    let healthy = relays.iter().filter(|r| r.healthy).count();
    let status = overall_status(healthy, relays.len());

    let status_code = match status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    let response = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        relays: RelayCounts {
            total: relays.len(),
            healthy,
        },
    };

    (status_code, Json(response))
}

/// Liveness probe endpoint
pub async fn liveness_check() -> (StatusCode, Json<SimpleHealthResponse>) {
    (
        StatusCode::OK,
        Json(SimpleHealthResponse {
            status: HealthStatus::Healthy,
        }),
    )
}
