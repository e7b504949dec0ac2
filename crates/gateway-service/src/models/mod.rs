//! Gateway models.
//!
//! Request-scoped identity types produced by admission and the response
//! bodies served by the HTTP layer.

use crate::services::rate_limiter::RateLimitKey;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Identity a request was admitted under.
///
/// Created fresh per request from either a verified token or the anonymous
/// default. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedIdentity {
    /// Token subject, or the demo subject for anonymous callers.
    pub subject: String,

    /// True only when the identity came from a verified token.
    pub authenticated: bool,

    /// Role claim (default: "user").
    pub role: String,

    /// Plan claim (default: "free").
    pub plan: String,

    /// Requests allowed per window.
    pub quota: u32,
}

impl ResolvedIdentity {
    /// Rate-limit key for this identity.
    ///
    /// Anonymous callers are keyed by client address, authenticated callers
    /// by subject.
    pub fn rate_limit_key(&self, client_addr: IpAddr) -> RateLimitKey {
        if self.authenticated {
            RateLimitKey::user(&self.subject)
        } else {
            RateLimitKey::ip(client_addr)
        }
    }
}

/// Result of a successful admission, stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub identity: ResolvedIdentity,

    /// Requests left in the current window. `None` when rate limiting is
    /// disabled.
    pub remaining: Option<u32>,
}

/// Detailed health response.
///
/// Returned by `/api/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always "healthy" while the process serves requests.
    pub status: String,

    /// RFC 3339 timestamp of the response.
    pub timestamp: String,

    /// Crate version.
    pub version: String,

    /// Seconds since the service started.
    pub uptime_seconds: u64,

    /// Operating mode ("development" or "production").
    pub environment: String,
}

/// Response body for `/api/v1/me`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeResponse {
    pub subject: String,
    pub authenticated: bool,
    pub role: String,
    pub plan: String,
    pub quota: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit_remaining: Option<u32>,
}

impl From<Admission> for MeResponse {
    fn from(admission: Admission) -> Self {
        let Admission {
            identity,
            remaining,
        } = admission;
        Self {
            subject: identity.subject,
            authenticated: identity.authenticated,
            role: identity.role,
            plan: identity.plan,
            quota: identity.quota,
            rate_limit_remaining: remaining,
        }
    }
}

/// Response body for `/api/v1/admin/ping`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminPingResponse {
    pub status: String,
    pub subject: String,
}

/// Response body for `/api/v1/premium/ping`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PremiumPingResponse {
    pub status: String,
    pub subject: String,
    pub plan: String,
}
