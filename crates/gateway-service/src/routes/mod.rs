//! HTTP routes for the gateway.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::middleware::{
    http_metrics_middleware, require_admin_role, require_admission, require_premium_plan,
    response_headers_middleware, AdmissionState, ResponseHeaderState,
};
use crate::services::AdmissionController;
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use common::clock::Clock;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Request timeout applied to every route.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Admission controller (owns the rate window table).
    pub controller: Arc<AdmissionController>,

    /// Time source for admission and health reporting.
    pub clock: Arc<dyn Clock>,

    /// When the service started, for uptime reporting.
    pub started_at: DateTime<Utc>,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness probe (simple "OK") - public
/// - `/api/health` - Detailed health - public
/// - `/metrics` - Prometheus metrics endpoint - public
/// - `/api/v1/me` - Resolved identity - admission required
/// - `/api/v1/admin/ping` - Admin check - admission and admin role required
/// - `/api/v1/premium/ping` - Plan check - admission and a premium plan required
/// - CORS from configured origins
/// - TraceLayer for request logging
/// - 30 second request timeout
/// - Response headers and HTTP metrics on every response
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let admission_state = AdmissionState {
        controller: Arc::clone(&state.controller),
        clock: Arc::clone(&state.clock),
    };
    let header_state = ResponseHeaderState::new(state.config.environment.as_str());
    let cors = cors_layer(&state.config.cors_origins);

    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/health", get(handlers::api_health))
        .with_state(Arc::clone(&state));

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Admission runs before the per-route gates
    let protected_routes = Router::new()
        .route("/api/v1/me", get(handlers::get_me))
        .route(
            "/api/v1/admin/ping",
            get(handlers::admin_ping).route_layer(middleware::from_fn(require_admin_role)),
        )
        .route(
            "/api/v1/premium/ping",
            get(handlers::premium_ping).route_layer(middleware::from_fn(require_premium_plan)),
        )
        .route_layer(middleware::from_fn_with_state(
            admission_state,
            require_admission,
        ))
        .with_state(state);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer (innermost)
    // 2. TraceLayer
    // 3. CorsLayer - answers preflight before routing
    // 4. response_headers_middleware
    // 5. http_metrics_middleware (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn_with_state(
            header_state,
            response_headers_middleware,
        ))
        .layer(middleware::from_fn(http_metrics_middleware))
}

/// CORS policy for the configured origins.
///
/// A `*` entry allows any origin without credentials; otherwise the listed
/// origins are allowed with credentials. Origins that are not valid header
/// values are skipped.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([
            header::RETRY_AFTER,
            header::WWW_AUTHENTICATE,
            HeaderName::from_static("x-process-time"),
            HeaderName::from_static("x-api-version"),
            HeaderName::from_static("x-environment"),
        ]);

    if origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(target: "gateway.routes", origin = %origin, "Skipping invalid CORS origin");
                None
            }
        })
        .collect();

    layer
        .allow_origin(AllowOrigin::list(allowed))
        .allow_credentials(true)
}
