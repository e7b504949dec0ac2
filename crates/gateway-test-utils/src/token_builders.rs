//! Builder patterns for test token construction
//!
//! Signs arbitrary claim sets, including ones the gateway itself would never
//! issue (missing subject, foreign algorithm, wrong secret).

use crate::fixtures::{fixed_start, TEST_SECRET};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};

/// Builder for hand-crafted test tokens
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_user("alice")
///     .with_plan("pro")
///     .expires_in(3600)
///     .sign();
/// ```
pub struct TestTokenBuilder {
    sub: Option<String>,
    role: Option<String>,
    plan: Option<String>,
    iat: i64,
    exp: Option<i64>,
    algorithm: Algorithm,
    secret: String,
}

impl TestTokenBuilder {
    /// Token for "test-subject", issued at `fixed_start`, valid for an hour,
    /// HS256 with `TEST_SECRET`.
    pub fn new() -> Self {
        let iat = fixed_start().timestamp();
        Self {
            sub: Some("test-subject".to_string()),
            role: None,
            plan: None,
            iat,
            exp: Some(iat + 3600),
            algorithm: Algorithm::HS256,
            secret: TEST_SECRET.to_string(),
        }
    }

    /// Set the subject
    pub fn for_user(mut self, subject: &str) -> Self {
        self.sub = Some(subject.to_string());
        self
    }

    /// Omit the subject claim
    pub fn without_subject(mut self) -> Self {
        self.sub = None;
        self
    }

    /// Set the role claim
    pub fn with_role(mut self, role: &str) -> Self {
        self.role = Some(role.to_string());
        self
    }

    /// Set the plan claim
    pub fn with_plan(mut self, plan: &str) -> Self {
        self.plan = Some(plan.to_string());
        self
    }

    /// Set the issued-at timestamp, keeping the lifetime
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        let lifetime = self.exp.map(|exp| exp - self.iat);
        self.iat = timestamp;
        self.exp = lifetime.map(|lifetime| timestamp + lifetime);
        self
    }

    /// Set expiration in seconds after issued-at
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = Some(self.iat + seconds);
        self
    }

    /// Omit the expiration claim
    pub fn without_expiry(mut self) -> Self {
        self.exp = None;
        self
    }

    /// Sign with a different HMAC algorithm
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Sign with a different secret
    pub fn with_secret(mut self, secret: &str) -> Self {
        self.secret = secret.to_string();
        self
    }

    /// Build the claims as a JSON value
    pub fn build(&self) -> Value {
        let mut claims = Map::new();
        if let Some(sub) = &self.sub {
            claims.insert("sub".to_string(), json!(sub));
        }
        claims.insert("iat".to_string(), json!(self.iat));
        if let Some(exp) = self.exp {
            claims.insert("exp".to_string(), json!(exp));
        }
        if let Some(role) = &self.role {
            claims.insert("role".to_string(), json!(role));
        }
        if let Some(plan) = &self.plan {
            claims.insert("plan".to_string(), json!(plan));
        }
        Value::Object(claims)
    }

    /// Sign the claims into a compact JWT
    pub fn sign(self) -> String {
        let claims = self.build();
        encode(
            &Header::new(self.algorithm),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .expect("test token should sign")
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
