//! Gateway configuration.
//!
//! Configuration is loaded from environment variables once at startup and
//! never reloaded. The signing secret is held in a `SecretString` and
//! redacted in Debug output.

use crate::services::admission::AnonymousPolicy;
use common::jwt::SigningAlgorithm;
use common::secret::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";

/// Signing secret used when none is configured in development.
///
/// Refused in production.
pub const DEV_SECRET_KEY: &str = "dev-secret-key-change-in-production";

/// Default access token lifetime (7 days).
pub const DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES: u64 = 60 * 24 * 7;

/// Maximum access token lifetime (1 year).
pub const MAX_ACCESS_TOKEN_EXPIRE_MINUTES: u64 = 60 * 24 * 365;

/// Default base rate limit (requests per window).
pub const DEFAULT_RATE_LIMIT_REQUESTS: u32 = 60;

/// Default rate limit window in seconds.
pub const DEFAULT_RATE_LIMIT_PERIOD_SECONDS: u64 = 60;

/// Maximum rate limit window in seconds (1 day).
pub const MAX_RATE_LIMIT_PERIOD_SECONDS: u64 = 86_400;

/// Default cap on distinct keys tracked by the rate limiter.
pub const DEFAULT_RATE_LIMIT_MAX_KEYS: usize = 100_000;

/// Default CORS origins for local development.
pub const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:8000",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:8000",
];

/// Operating mode of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" | "local" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gateway configuration.
#[derive(Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8000").
    pub bind_address: String,

    /// Operating mode.
    pub environment: Environment,

    /// Shared HMAC signing secret.
    pub secret_key: SecretString,

    /// JWT signing algorithm (default: HS256).
    pub jwt_algorithm: SigningAlgorithm,

    /// Access token lifetime in minutes.
    pub access_token_expire_minutes: u64,

    /// Whether the sliding-window limiter runs at all.
    pub rate_limit_enabled: bool,

    /// Base request limit per window. Anonymous clients get half.
    pub rate_limit_requests: u32,

    /// Sliding window length in seconds.
    pub rate_limit_period_seconds: u64,

    /// Maximum number of distinct rate-limit keys kept in memory.
    pub rate_limit_max_keys: usize,

    /// What to do with requests that carry no credential.
    pub anonymous_policy: AnonymousPolicy,

    /// Allowed CORS origins. `*` allows any origin.
    pub cors_origins: Vec<String>,

    /// Seconds to wait after a shutdown signal before exiting.
    pub shutdown_drain_seconds: u64,
}

/// Custom Debug implementation that redacts the signing secret.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("environment", &self.environment)
            .field("secret_key", &"[REDACTED]")
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field(
                "access_token_expire_minutes",
                &self.access_token_expire_minutes,
            )
            .field("rate_limit_enabled", &self.rate_limit_enabled)
            .field("rate_limit_requests", &self.rate_limit_requests)
            .field("rate_limit_period_seconds", &self.rate_limit_period_seconds)
            .field("rate_limit_max_keys", &self.rate_limit_max_keys)
            .field("anonymous_policy", &self.anonymous_policy)
            .field("cors_origins", &self.cors_origins)
            .field("shutdown_drain_seconds", &self.shutdown_drain_seconds)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid ENVIRONMENT value: {0}")]
    InvalidEnvironment(String),

    #[error("Invalid signing secret: {0}")]
    InvalidSecret(String),

    #[error("Invalid JWT algorithm: {0}")]
    InvalidAlgorithm(String),

    #[error("Invalid token lifetime configuration: {0}")]
    InvalidTokenLifetime(String),

    #[error("Invalid rate limit configuration: {0}")]
    InvalidRateLimit(String),

    #[error("Invalid anonymous policy: {0}")]
    InvalidAnonymousPolicy(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let environment = match vars.get("ENVIRONMENT") {
            Some(value) => value.parse()?,
            None => Environment::Development,
        };

        let secret_key = match (vars.get("SECRET_KEY"), environment) {
            (Some(secret), _) if secret.is_empty() => {
                return Err(ConfigError::InvalidSecret(
                    "SECRET_KEY must not be empty".to_string(),
                ));
            }
            (Some(secret), Environment::Production) if secret == DEV_SECRET_KEY => {
                return Err(ConfigError::InvalidSecret(
                    "the development secret cannot be used in production".to_string(),
                ));
            }
            (Some(secret), _) => SecretString::from(secret.clone()),
            (None, Environment::Development) => SecretString::from(DEV_SECRET_KEY),
            (None, Environment::Production) => {
                return Err(ConfigError::MissingEnvVar("SECRET_KEY".to_string()));
            }
        };

        let jwt_algorithm = match vars.get("JWT_ALGORITHM") {
            Some(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidAlgorithm(format!("{e}")))?,
            None => SigningAlgorithm::default(),
        };

        let access_token_expire_minutes = parse_var(
            vars,
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES,
        )?;
        if !(1..=MAX_ACCESS_TOKEN_EXPIRE_MINUTES).contains(&access_token_expire_minutes) {
            return Err(ConfigError::InvalidTokenLifetime(format!(
                "ACCESS_TOKEN_EXPIRE_MINUTES must be between 1 and {}, got {}",
                MAX_ACCESS_TOKEN_EXPIRE_MINUTES, access_token_expire_minutes
            )));
        }

        let rate_limit_enabled = parse_var(vars, "RATE_LIMIT_ENABLED", true)?;

        let rate_limit_requests =
            parse_var(vars, "RATE_LIMIT_REQUESTS", DEFAULT_RATE_LIMIT_REQUESTS)?;
        if rate_limit_requests == 0 {
            return Err(ConfigError::InvalidRateLimit(
                "RATE_LIMIT_REQUESTS must be at least 1".to_string(),
            ));
        }

        let rate_limit_period_seconds = parse_var(
            vars,
            "RATE_LIMIT_PERIOD",
            DEFAULT_RATE_LIMIT_PERIOD_SECONDS,
        )?;
        if !(1..=MAX_RATE_LIMIT_PERIOD_SECONDS).contains(&rate_limit_period_seconds) {
            return Err(ConfigError::InvalidRateLimit(format!(
                "RATE_LIMIT_PERIOD must be between 1 and {}, got {}",
                MAX_RATE_LIMIT_PERIOD_SECONDS, rate_limit_period_seconds
            )));
        }

        let rate_limit_max_keys =
            parse_var(vars, "RATE_LIMIT_MAX_KEYS", DEFAULT_RATE_LIMIT_MAX_KEYS)?;
        if rate_limit_max_keys == 0 {
            return Err(ConfigError::InvalidRateLimit(
                "RATE_LIMIT_MAX_KEYS must be at least 1".to_string(),
            ));
        }

        let anonymous_policy = match vars.get("ANONYMOUS_POLICY") {
            Some(value) => value.parse()?,
            None => AnonymousPolicy::for_environment(environment),
        };

        let cors_origins = match vars.get("BACKEND_CORS_ORIGINS") {
            Some(value) => value
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(ToString::to_string)
                .collect(),
            None => DEFAULT_CORS_ORIGINS
                .iter()
                .map(|origin| (*origin).to_string())
                .collect(),
        };

        let shutdown_drain_seconds = parse_var(vars, "SHUTDOWN_DRAIN_SECONDS", 0)?;

        Ok(Config {
            bind_address,
            environment,
            secret_key,
            jwt_algorithm,
            access_token_expire_minutes,
            rate_limit_enabled,
            rate_limit_requests,
            rate_limit_period_seconds,
            rate_limit_max_keys,
            anonymous_policy,
            cors_origins,
            shutdown_drain_seconds,
        })
    }

    /// Default access token lifetime.
    pub fn access_token_ttl(&self) -> chrono::Duration {
        // Bounded by MAX_ACCESS_TOKEN_EXPIRE_MINUTES during loading
        #[allow(clippy::cast_possible_wrap)]
        chrono::Duration::minutes(self.access_token_expire_minutes as i64)
    }

    /// Sliding window length.
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_period_seconds)
    }

    /// Limit applied to anonymous clients: half the base limit, at least 1.
    ///
    /// The floor keeps `RATE_LIMIT_REQUESTS=1` from turning an allowed
    /// anonymous policy into one that throttles every request.
    pub fn anonymous_rate_limit(&self) -> u32 {
        (self.rate_limit_requests / 2).max(1)
    }

    /// Whether the signing secret is still the development default.
    pub fn uses_dev_secret(&self) -> bool {
        self.secret_key.expose_secret() == DEV_SECRET_KEY
    }
}

/// Parse an optional variable, falling back to `default` when unset.
fn parse_var<T>(vars: &HashMap<String, String>, name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match vars.get(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                name: name.to_string(),
                reason: format!("'{}': {}", value, e),
            }),
        None => Ok(default),
    }
}
