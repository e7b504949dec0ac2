//! Admission middleware for protected routes.
//!
//! Provides three middleware functions:
//! - `require_admission` - resolves the caller and enforces its window
//! - `require_admin_role` - role gate, layered inside `require_admission`
//! - `require_premium_plan` - plan gate, layered inside `require_admission`
//!
//! The resolved [`Admission`] is stored in request extensions for handlers.
//! Every refusal is counted by operation and error category.

use crate::errors::GatewayError;
use crate::models::Admission;
use crate::observability::metrics::record_error;
use crate::observability::ErrorCategory;
use crate::services::admission::{
    require_plan, require_role, AdmissionController, ADMIN_ROLE, PREMIUM_PLANS,
};
use axum::{
    extract::{ConnectInfo, Request, State},
    http::header,
    middleware::Next,
    response::IntoResponse,
};
use common::clock::Clock;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::instrument;

/// State for the admission middleware.
#[derive(Clone)]
pub struct AdmissionState {
    pub controller: Arc<AdmissionController>,
    pub clock: Arc<dyn Clock>,
}

/// Extract an optional bearer credential from the Authorization header.
///
/// An absent header is `Ok(None)`. A header that is present but is not a
/// non-empty Bearer credential is malformed.
fn extract_bearer_token(req: &Request) -> Result<Option<&str>, GatewayError> {
    let Some(value) = req.headers().get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value.to_str().map_err(|_| {
        tracing::debug!(target: "gateway.middleware.admission", "Non-ASCII Authorization header");
        GatewayError::MalformedCredential
    })?;

    let (scheme, token) = value.split_once(' ').ok_or_else(|| {
        tracing::debug!(target: "gateway.middleware.admission", "Invalid Authorization header format");
        GatewayError::MalformedCredential
    })?;

    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        tracing::debug!(target: "gateway.middleware.admission", "Invalid Authorization header format");
        return Err(GatewayError::MalformedCredential);
    }

    Ok(Some(token))
}

/// Admission middleware.
///
/// # Response
///
/// - 401 Unauthorized for missing (when anonymous callers are rejected),
///   malformed, or expired credentials
/// - 429 Too Many Requests when the caller's window is exhausted
/// - Continues to the next handler with `Admission` in extensions otherwise
#[instrument(skip_all, name = "gateway.middleware.admission")]
pub async fn require_admission(
    State(state): State<AdmissionState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, GatewayError> {
    let client_addr = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .ok_or_else(|| {
            tracing::error!(
                target: "gateway.middleware.admission",
                "Client address unavailable; serve with connect info"
            );
            GatewayError::Internal
        })?;

    let admission = extract_bearer_token(&req)
        .and_then(|credential| {
            state
                .controller
                .admit(credential, client_addr, state.clock.now())
        })
        .inspect_err(|e| record_refusal("admission", e))?;

    req.extensions_mut().insert(admission);

    Ok(next.run(req).await)
}

/// Admin gate. Must run after `require_admission`.
///
/// # Response
///
/// - 403 Forbidden when the admitted identity is not an admin
#[instrument(skip_all, name = "gateway.middleware.admin")]
pub async fn require_admin_role(
    req: Request,
    next: Next,
) -> Result<impl IntoResponse, GatewayError> {
    admitted_identity(&req)
        .and_then(|admission| require_role(&admission.identity, ADMIN_ROLE))
        .inspect_err(|e| record_refusal("admin_gate", e))?;

    Ok(next.run(req).await)
}

/// Premium plan gate. Must run after `require_admission`.
///
/// # Response
///
/// - 403 Forbidden when the admitted identity's plan is not premium
#[instrument(skip_all, name = "gateway.middleware.premium")]
pub async fn require_premium_plan(
    req: Request,
    next: Next,
) -> Result<impl IntoResponse, GatewayError> {
    admitted_identity(&req)
        .and_then(|admission| require_plan(&admission.identity, PREMIUM_PLANS))
        .inspect_err(|e| record_refusal("premium_gate", e))?;

    Ok(next.run(req).await)
}

fn admitted_identity(req: &Request) -> Result<&Admission, GatewayError> {
    req.extensions().get::<Admission>().ok_or_else(|| {
        tracing::error!(
            target: "gateway.middleware.admission",
            "Gate reached without an admission"
        );
        GatewayError::Internal
    })
}

fn record_refusal(operation: &str, error: &GatewayError) {
    let category = ErrorCategory::from(error);
    tracing::debug!(
        target: "gateway.middleware.admission",
        operation = operation,
        error_category = category.as_str(),
        "Request refused"
    );
    record_error(operation, category.as_str(), error.status_code());
}
