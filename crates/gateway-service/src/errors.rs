//! Gateway error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl.
//! Client-facing messages distinguish a missing credential from a bad one
//! but never carry claim contents or signing material. Internal details are
//! logged server-side.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Gateway error type.
///
/// Maps to HTTP status codes:
/// - MissingCredential, MalformedCredential, ExpiredCredential: 401 Unauthorized
/// - RateLimitExceeded: 429 Too Many Requests
/// - Forbidden: 403 Forbidden
/// - InvalidTokenLifetime, Crypto, Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Authentication required")]
    MissingCredential,

    #[error("Invalid authentication credentials")]
    MalformedCredential,

    #[error("Authentication credentials have expired")]
    ExpiredCredential,

    #[error("Rate limit exceeded, retry after {retry_after_seconds}s")]
    RateLimitExceeded { retry_after_seconds: u64 },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Token lifetime must be positive, got {0}s")]
    InvalidTokenLifetime(i64),

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error("Internal server error")]
    Internal,
}

impl GatewayError {
    /// Returns the HTTP status code for this error (for metrics recording).
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::MissingCredential
            | GatewayError::MalformedCredential
            | GatewayError::ExpiredCredential => 401,
            GatewayError::RateLimitExceeded { .. } => 429,
            GatewayError::Forbidden(_) => 403,
            GatewayError::InvalidTokenLifetime(_)
            | GatewayError::Crypto(_)
            | GatewayError::Internal => 500,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            GatewayError::MissingCredential => (
                StatusCode::UNAUTHORIZED,
                "MISSING_CREDENTIAL",
                "Authentication required".to_string(),
            ),
            GatewayError::MalformedCredential => (
                StatusCode::UNAUTHORIZED,
                "INVALID_TOKEN",
                "Invalid authentication credentials".to_string(),
            ),
            GatewayError::ExpiredCredential => (
                StatusCode::UNAUTHORIZED,
                "TOKEN_EXPIRED",
                "Token has expired".to_string(),
            ),
            GatewayError::RateLimitExceeded { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMIT_EXCEEDED",
                "Rate limit exceeded. Please try again later.".to_string(),
            ),
            GatewayError::Forbidden(reason) => {
                (StatusCode::FORBIDDEN, "FORBIDDEN", reason.clone())
            }
            GatewayError::InvalidTokenLifetime(_) | GatewayError::Crypto(_) => {
                tracing::error!(target: "gateway.crypto", error = %self, "Token operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CRYPTO_ERROR",
                    "An internal cryptographic error occurred".to_string(),
                )
            }
            GatewayError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        match &self {
            GatewayError::MissingCredential => {
                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static("Bearer realm=\"ai-gateway\""),
                );
            }
            GatewayError::MalformedCredential | GatewayError::ExpiredCredential => {
                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static("Bearer realm=\"ai-gateway\", error=\"invalid_token\""),
                );
            }
            GatewayError::RateLimitExceeded {
                retry_after_seconds,
            } => {
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(*retry_after_seconds));
            }
            _ => {}
        }

        response
    }
}
