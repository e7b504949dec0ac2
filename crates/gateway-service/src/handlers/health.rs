//! Health check handlers.
//!
//! - `/health`: liveness probe, plain "OK"
//! - `/api/health`: detailed status with version and uptime

use crate::models::HealthResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use chrono::SecondsFormat;
use std::sync::Arc;

/// Liveness probe handler.
///
/// Does not check any dependencies; failure means the process is hung.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Detailed health handler.
#[tracing::instrument(skip_all, name = "gateway.health.detailed")]
pub async fn api_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let now = state.clock.now();
    let uptime_seconds = (now - state.started_at).num_seconds().max(0).unsigned_abs();

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: now.to_rfc3339_opts(SecondsFormat::Secs, true),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        environment: state.config.environment.as_str().to_string(),
    })
}
