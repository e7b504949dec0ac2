//! Middleware for the gateway.
//!
//! # Components
//!
//! - `admission` - credential extraction, admission, and the admin and premium gates
//! - `http_metrics` - HTTP request metrics
//! - `response_headers` - process time, API version and environment headers

pub mod admission;
pub mod http_metrics;
pub mod response_headers;

pub use admission::{require_admin_role, require_admission, require_premium_plan, AdmissionState};
pub use http_metrics::http_metrics_middleware;
pub use response_headers::{response_headers_middleware, ResponseHeaderState};
