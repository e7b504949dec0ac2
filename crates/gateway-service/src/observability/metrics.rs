//! Metrics definitions for the gateway.
//!
//! All metrics follow Prometheus naming conventions:
//! - `gateway_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `status`: success, error
//! - `error_category`: authentication, throttling, authorization, internal, none
//! - `action`: allowed, rejected
//! - `reason`: idle, capacity
//! - `operation`: admission, admin_gate, premium_gate
//! - `endpoint`: normalized to the known route set plus `/other`

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus recorder and return the handle used by
/// `/metrics`.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("gateway_http_request".to_string()),
            &[
                0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `gateway_http_requests_total`, `gateway_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status` / `status_code`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("gateway_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.clone(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("gateway_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        429 => "throttled",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Map a request path onto the bounded endpoint label set.
fn normalize_endpoint(path: &str) -> String {
    match path {
        "/health"
        | "/metrics"
        | "/api/health"
        | "/api/v1/me"
        | "/api/v1/admin/ping"
        | "/api/v1/premium/ping" => path.to_string(),
        _ => "/other".to_string(),
    }
}

// ============================================================================
// Token Metrics
// ============================================================================

/// Record a token issuance attempt
///
/// Metric: `gateway_token_issuance_total`
/// Labels: `status`
pub fn record_token_issuance(status: &str) {
    counter!("gateway_token_issuance_total", "status" => status.to_string()).increment(1);
}

/// Record token validation result
///
/// Metric: `gateway_token_validations_total`
/// Labels: `status`, `error_category`
pub fn record_token_validation(status: &str, error_category: Option<&str>) {
    let category = error_category.unwrap_or("none");
    counter!("gateway_token_validations_total", "status" => status.to_string(), "error_category" => category.to_string())
        .increment(1);
}

// ============================================================================
// Rate Limiting Metrics
// ============================================================================

/// Record rate limit decision
///
/// Metric: `gateway_rate_limit_decisions_total`
/// Labels: `action` (allowed, rejected)
pub fn record_rate_limit_decision(action: &str) {
    counter!("gateway_rate_limit_decisions_total", "action" => action.to_string()).increment(1);
}

/// Record keys dropped from the window table
///
/// Metric: `gateway_rate_limit_evictions_total`
/// Labels: `reason` (idle, capacity)
pub fn record_rate_limit_evictions(reason: &str, count: u64) {
    if count > 0 {
        counter!("gateway_rate_limit_evictions_total", "reason" => reason.to_string())
            .increment(count);
    }
}

/// Update the tracked key gauge
///
/// Metric: `gateway_rate_limit_tracked_keys`
pub fn set_rate_limit_tracked_keys(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("gateway_rate_limit_tracked_keys").set(count as f64);
}

// ============================================================================
// Error Metrics
// ============================================================================

/// Record a request refused by admission or a gate
///
/// Metric: `gateway_errors_total`
/// Labels: `operation`, `error_category`, `status_code`
pub fn record_error(operation: &str, error_category: &str, status_code: u16) {
    counter!("gateway_errors_total",
        "operation" => operation.to_string(),
        "error_category" => error_category.to_string(),
        "status_code" => status_code.to_string()
    )
    .increment(1);
}
