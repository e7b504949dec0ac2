//! Admission controller.
//!
//! Resolves a request to an identity, derives its quota, and enforces the
//! sliding window for that identity. The steps always run in this order,
//! so the rate-limit key and quota come from a fully resolved identity and
//! never from a partially verified credential.

use crate::config::{Config, ConfigError, Environment};
use crate::crypto::TokenAuthority;
use crate::errors::GatewayError;
use crate::models::{Admission, ResolvedIdentity};
use crate::observability::hash_for_correlation;
use crate::services::rate_limiter::{Admitted, RateLimitKey, SlidingWindowLimiter};
use chrono::{DateTime, Utc};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;
use tracing::instrument;

/// Subject given to anonymous callers when they are admitted.
pub const DEMO_SUBJECT: &str = "demo_user";

/// Role assumed when a token carries none.
pub const DEFAULT_ROLE: &str = "user";

/// Plan assumed when a token carries none.
pub const DEFAULT_PLAN: &str = "free";

/// Role required by administrative endpoints.
pub const ADMIN_ROLE: &str = "admin";

/// Plans with access to premium endpoints.
pub const PREMIUM_PLANS: &[&str] = &["pro", "enterprise", "admin"];

/// Quota for plans not in the table.
pub const DEFAULT_QUOTA: u32 = 100;

/// How requests without a credential are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnonymousPolicy {
    /// Fail with `MissingCredential`.
    Reject,
    /// Admit under the demo identity at the anonymous rate limit.
    AllowWithDefaultIdentity,
}

impl AnonymousPolicy {
    /// Default for an operating mode: development admits anonymous callers,
    /// production rejects them.
    pub fn for_environment(environment: Environment) -> Self {
        match environment {
            Environment::Development => AnonymousPolicy::AllowWithDefaultIdentity,
            Environment::Production => AnonymousPolicy::Reject,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnonymousPolicy::Reject => "reject",
            AnonymousPolicy::AllowWithDefaultIdentity => "allow",
        }
    }
}

impl FromStr for AnonymousPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(AnonymousPolicy::Reject),
            "allow" | "allow_with_default_identity" => {
                Ok(AnonymousPolicy::AllowWithDefaultIdentity)
            }
            other => Err(ConfigError::InvalidAnonymousPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for AnonymousPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requests per window granted to a plan.
pub fn quota_for_plan(plan: &str) -> u32 {
    match plan {
        "free" => 100,
        "pro" => 1_000,
        "enterprise" => 10_000,
        _ => DEFAULT_QUOTA,
    }
}

/// Fail with `Forbidden` unless the identity holds `role`.
pub fn require_role(identity: &ResolvedIdentity, role: &str) -> Result<(), GatewayError> {
    if identity.role == role {
        Ok(())
    } else {
        tracing::debug!(
            target: "gateway.admission",
            subject = %hash_for_correlation(&identity.subject),
            required_role = role,
            "Role check failed"
        );
        Err(GatewayError::Forbidden(format!("{} access required", role)))
    }
}

/// Fail with `Forbidden` unless the identity's plan is in `allowed`.
pub fn require_plan(identity: &ResolvedIdentity, allowed: &[&str]) -> Result<(), GatewayError> {
    if allowed.contains(&identity.plan.as_str()) {
        Ok(())
    } else {
        tracing::debug!(
            target: "gateway.admission",
            subject = %hash_for_correlation(&identity.subject),
            plan = %identity.plan,
            "Plan check failed"
        );
        Err(GatewayError::Forbidden(
            "Subscription upgrade required".to_string(),
        ))
    }
}

/// Resolves identities and enforces per-identity request windows.
///
/// Owns the window table exclusively; the token authority is shared.
#[derive(Debug)]
pub struct AdmissionController {
    authority: Arc<TokenAuthority>,
    limiter: SlidingWindowLimiter,
    anonymous_policy: AnonymousPolicy,
    anonymous_quota: u32,
    rate_limit_enabled: bool,
}

impl AdmissionController {
    pub fn new(
        authority: Arc<TokenAuthority>,
        limiter: SlidingWindowLimiter,
        anonymous_policy: AnonymousPolicy,
        anonymous_quota: u32,
        rate_limit_enabled: bool,
    ) -> Self {
        Self {
            authority,
            limiter,
            anonymous_policy,
            anonymous_quota,
            rate_limit_enabled,
        }
    }

    /// Build a controller from loaded configuration.
    pub fn from_config(config: &Config, authority: Arc<TokenAuthority>) -> Self {
        Self::new(
            authority,
            SlidingWindowLimiter::new(config.rate_limit_window(), config.rate_limit_max_keys),
            config.anonymous_policy,
            config.anonymous_rate_limit(),
            config.rate_limit_enabled,
        )
    }

    pub fn authority(&self) -> &TokenAuthority {
        &self.authority
    }

    pub fn limiter(&self) -> &SlidingWindowLimiter {
        &self.limiter
    }

    pub fn anonymous_policy(&self) -> AnonymousPolicy {
        self.anonymous_policy
    }

    /// Resolve the caller's identity.
    ///
    /// With no credential the anonymous policy decides. With a credential,
    /// verification failures propagate; they never fall back to anonymous.
    #[instrument(skip_all)]
    pub fn resolve_identity(
        &self,
        credential: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ResolvedIdentity, GatewayError> {
        let Some(token) = credential else {
            return match self.anonymous_policy {
                AnonymousPolicy::Reject => {
                    tracing::debug!(
                        target: "gateway.admission",
                        "Anonymous request rejected by policy"
                    );
                    Err(GatewayError::MissingCredential)
                }
                AnonymousPolicy::AllowWithDefaultIdentity => Ok(ResolvedIdentity {
                    subject: DEMO_SUBJECT.to_string(),
                    authenticated: false,
                    role: DEFAULT_ROLE.to_string(),
                    plan: DEFAULT_PLAN.to_string(),
                    quota: self.anonymous_quota,
                }),
            };
        };

        let claims = self.authority.verify_at(token, now)?;
        let role = claims.role.unwrap_or_else(|| DEFAULT_ROLE.to_string());
        let plan = claims.plan.unwrap_or_else(|| DEFAULT_PLAN.to_string());
        let quota = quota_for_plan(&plan);

        Ok(ResolvedIdentity {
            subject: claims.sub,
            authenticated: true,
            role,
            plan,
            quota,
        })
    }

    /// Admit or reject one request for `key` against `limit`.
    pub fn check_and_record(
        &self,
        key: &RateLimitKey,
        limit: u32,
        now: DateTime<Utc>,
    ) -> Result<Admitted, GatewayError> {
        self.limiter.check_and_record(key, limit, now)
    }

    /// Resolve, key, then check-and-record.
    ///
    /// When rate limiting is disabled the window is not consulted and
    /// `remaining` is `None`.
    #[instrument(skip_all)]
    pub fn admit(
        &self,
        credential: Option<&str>,
        client_addr: IpAddr,
        now: DateTime<Utc>,
    ) -> Result<Admission, GatewayError> {
        let identity = self.resolve_identity(credential, now)?;

        if !self.rate_limit_enabled {
            return Ok(Admission {
                identity,
                remaining: None,
            });
        }

        let key = identity.rate_limit_key(client_addr);
        let admitted = self
            .check_and_record(&key, identity.quota, now)
            .inspect_err(|_| {
                tracing::info!(
                    target: "gateway.admission",
                    key = %hash_for_correlation(key.as_str()),
                    quota = identity.quota,
                    "Request throttled"
                );
            })?;

        Ok(Admission {
            identity,
            remaining: Some(admitted.remaining),
        })
    }
}
