//! Token authority: issues and verifies signed, time-bounded identity
//! assertions.
//!
//! Tokens are JWTs signed with a process-wide HMAC secret. The algorithm is
//! pinned by configuration; a token whose header names any other algorithm
//! is rejected. Verification is a pure function of the token, the present
//! time, and the secret.
//!
//! `issue`/`verify` read the injected [`Clock`]; `issue_at`/`verify_at`
//! take the present time explicitly so expiry boundaries can be tested
//! without wall-clock dependence.

use crate::config::Config;
use crate::errors::GatewayError;
use crate::observability::hash_for_correlation;
use crate::observability::metrics::{record_token_issuance, record_token_validation};
use chrono::{DateTime, Duration, Utc};
use common::clock::Clock;
use common::jwt::{
    check_token_size, validate_iat_at, IdentityClaims, SigningAlgorithm, DEFAULT_CLOCK_SKEW,
};
use common::secret::{ExposeSecret, SecretString};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use std::fmt;
use std::sync::Arc;
use tracing::instrument;

/// Issues and verifies gateway access tokens.
///
/// Holds no mutable state, so a single instance is shared across all
/// request tasks behind an `Arc`.
pub struct TokenAuthority {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: SigningAlgorithm,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
}

/// Key material is never printed.
impl fmt::Debug for TokenAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuthority")
            .field("keys", &"[REDACTED]")
            .field("algorithm", &self.algorithm)
            .field("default_ttl_seconds", &self.default_ttl.num_seconds())
            .field("clock", &self.clock)
            .finish()
    }
}

impl TokenAuthority {
    /// Build an authority from the shared secret.
    pub fn new(
        secret: &SecretString,
        algorithm: SigningAlgorithm,
        default_ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let secret_bytes = secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret_bytes),
            decoding_key: DecodingKey::from_secret(secret_bytes),
            algorithm,
            default_ttl,
            clock,
        }
    }

    /// Build an authority from loaded configuration.
    pub fn from_config(config: &Config, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            &config.secret_key,
            config.jwt_algorithm,
            config.access_token_ttl(),
            clock,
        )
    }

    /// Algorithm tokens are signed with.
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    /// Lifetime applied when `issue` is called without an explicit ttl.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Issue a token for `subject`, valid from now for `ttl` (or the
    /// configured default lifetime).
    pub fn issue(
        &self,
        subject: &str,
        role: Option<&str>,
        plan: Option<&str>,
        ttl: Option<Duration>,
    ) -> Result<String, GatewayError> {
        self.issue_at(subject, role, plan, ttl, self.clock.now())
    }

    /// Issue a token as if the present time were `now`.
    #[instrument(skip_all)]
    pub fn issue_at(
        &self,
        subject: &str,
        role: Option<&str>,
        plan: Option<&str>,
        ttl: Option<Duration>,
        now: DateTime<Utc>,
    ) -> Result<String, GatewayError> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let ttl_seconds = ttl.num_seconds();
        if ttl_seconds <= 0 {
            record_token_issuance("error");
            return Err(GatewayError::InvalidTokenLifetime(ttl_seconds));
        }

        let iat = now.timestamp();
        let claims = IdentityClaims {
            sub: subject.to_string(),
            iat,
            exp: iat.saturating_add(ttl_seconds),
            role: role.map(ToString::to_string),
            plan: plan.map(ToString::to_string),
        };

        let header = Header::new(self.algorithm.to_jsonwebtoken());
        let token = encode(&header, &claims, &self.encoding_key).map_err(|e| {
            record_token_issuance("error");
            GatewayError::Crypto(format!("JWT signing operation failed: {}", e))
        })?;

        record_token_issuance("success");
        tracing::info!(
            target: "gateway.crypto",
            subject = %hash_for_correlation(subject),
            ttl_seconds = ttl_seconds,
            "Token issued"
        );

        Ok(token)
    }

    /// Verify `token` against the present time.
    pub fn verify(&self, token: &str) -> Result<IdentityClaims, GatewayError> {
        self.verify_at(token, self.clock.now())
    }

    /// Verify `token` as if the present time were `now`.
    ///
    /// Validates, in order:
    /// - Token size (must be <= `MAX_JWT_SIZE_BYTES`), before any parsing
    /// - Signature and algorithm
    /// - Presence and shape of `sub`, `iat`, `exp`
    /// - `iat` not too far in the future (clock skew tolerance)
    /// - `now < exp`
    ///
    /// Returns the claims unchanged on success.
    ///
    /// # Errors
    ///
    /// - `ExpiredCredential` when `now >= exp`
    /// - `MalformedCredential` for everything else
    #[instrument(skip_all)]
    pub fn verify_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<IdentityClaims, GatewayError> {
        check_token_size(token).map_err(|_| {
            record_token_validation("error", Some("size"));
            GatewayError::MalformedCredential
        })?;

        let mut validation = Validation::new(self.algorithm.to_jsonwebtoken());
        // Expiry is checked below against the supplied `now`, not the
        // library's own wall clock.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let token_data =
            decode::<IdentityClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                tracing::debug!(target: "gateway.crypto", error = %e, "Token verification failed");
                record_token_validation("error", Some("malformed"));
                GatewayError::MalformedCredential
            })?;
        let claims = token_data.claims;

        let now_secs = now.timestamp();
        validate_iat_at(claims.iat, DEFAULT_CLOCK_SKEW, now_secs).map_err(|_| {
            record_token_validation("error", Some("clock_skew"));
            GatewayError::MalformedCredential
        })?;

        if claims.is_expired_at(now_secs) {
            tracing::debug!(
                target: "gateway.crypto",
                exp = claims.exp,
                now = now_secs,
                "Token rejected: expired"
            );
            record_token_validation("error", Some("expired"));
            return Err(GatewayError::ExpiredCredential);
        }

        record_token_validation("success", None);
        Ok(claims)
    }
}
