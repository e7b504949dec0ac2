//! Identity handlers.
//!
//! Return the identity the admission middleware resolved for the request.

use crate::models::{AdminPingResponse, Admission, MeResponse, PremiumPingResponse};
use axum::{Extension, Json};
use tracing::instrument;

/// Handler for GET /api/v1/me
///
/// ## Response
///
/// ```json
/// {
///   "subject": "alice",
///   "authenticated": true,
///   "role": "user",
///   "plan": "pro",
///   "quota": 1000,
///   "rate_limit_remaining": 999
/// }
/// ```
#[instrument(skip_all, name = "gateway.handlers.me")]
pub async fn get_me(Extension(admission): Extension<Admission>) -> Json<MeResponse> {
    tracing::debug!(target: "gateway.handlers.me", "Returning resolved identity");
    Json(MeResponse::from(admission))
}

/// Handler for GET /api/v1/admin/ping
///
/// Reachable only through the admin gate.
#[instrument(skip_all, name = "gateway.handlers.admin_ping")]
pub async fn admin_ping(Extension(admission): Extension<Admission>) -> Json<AdminPingResponse> {
    Json(AdminPingResponse {
        status: "ok".to_string(),
        subject: admission.identity.subject,
    })
}

/// Handler for GET /api/v1/premium/ping
///
/// Reachable only through the premium plan gate.
#[instrument(skip_all, name = "gateway.handlers.premium_ping")]
pub async fn premium_ping(
    Extension(admission): Extension<Admission>,
) -> Json<PremiumPingResponse> {
    Json(PremiumPingResponse {
        status: "ok".to_string(),
        subject: admission.identity.subject,
        plan: admission.identity.plan,
    })
}
