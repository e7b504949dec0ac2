//! Observability for the gateway.
//!
//! # Privacy by Default
//!
//! Operations touching credentials use `#[instrument(skip_all)]`. Fields are
//! categorized as:
//! - **SAFE**: Can be logged in plaintext (enums, outcomes, counts)
//! - **HASHED**: Logged only through [`hash_for_correlation`] (subjects, client addresses)
//! - **NEVER**: Must never appear in logs (tokens, signing secret)

pub mod metrics;

use crate::errors::GatewayError;
use sha2::{Digest, Sha256};

/// Hash a field value for correlation in logs (SHA-256, first 8 hex chars)
///
/// This is a one-way correlation handle, not protection for secrets.
pub fn hash_for_correlation(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let result = hasher.finalize();
    hex::encode(result.get(..4).unwrap_or_default())
}

/// Error categories for metrics labels (bounded cardinality).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Missing, malformed, or expired credentials
    Authentication,
    /// Sliding window exhausted
    Throttling,
    /// Role or plan gate refused the request
    Authorization,
    /// Signing failures and everything else
    Internal,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Authentication => "authentication",
            ErrorCategory::Throttling => "throttling",
            ErrorCategory::Authorization => "authorization",
            ErrorCategory::Internal => "internal",
        }
    }
}

impl From<&GatewayError> for ErrorCategory {
    fn from(err: &GatewayError) -> Self {
        match err {
            GatewayError::MissingCredential
            | GatewayError::MalformedCredential
            | GatewayError::ExpiredCredential => ErrorCategory::Authentication,
            GatewayError::RateLimitExceeded { .. } => ErrorCategory::Throttling,
            GatewayError::Forbidden(_) => ErrorCategory::Authorization,
            GatewayError::InvalidTokenLifetime(_)
            | GatewayError::Crypto(_)
            | GatewayError::Internal => ErrorCategory::Internal,
        }
    }
}
