//! Response header middleware.
//!
//! Stamps every response with processing time, API version and operating
//! mode.

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

pub const X_PROCESS_TIME: HeaderName = HeaderName::from_static("x-process-time");
pub const X_API_VERSION: HeaderName = HeaderName::from_static("x-api-version");
pub const X_ENVIRONMENT: HeaderName = HeaderName::from_static("x-environment");

/// Static header values, computed once when routes are built.
#[derive(Clone)]
pub struct ResponseHeaderState {
    pub api_version: HeaderValue,
    pub environment: HeaderValue,
}

impl ResponseHeaderState {
    pub fn new(environment: &'static str) -> Self {
        Self {
            api_version: HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
            environment: HeaderValue::from_static(environment),
        }
    }
}

/// Adds `X-Process-Time` (seconds), `X-API-Version` and `X-Environment`.
pub async fn response_headers_middleware(
    State(state): State<ResponseHeaderState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let mut response = next.run(request).await;
    let elapsed = start.elapsed().as_secs_f64();

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&format!("{elapsed:.6}")) {
        headers.insert(X_PROCESS_TIME, value);
    }
    headers.insert(X_API_VERSION, state.api_version);
    headers.insert(X_ENVIRONMENT, state.environment);

    response
}
