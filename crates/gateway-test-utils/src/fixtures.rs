//! Deterministic test fixtures
//!
//! Fixed secret and start time so tokens and windows are reproducible.

use chrono::{DateTime, TimeZone, Utc};
use gateway_service::config::Config;
use std::collections::HashMap;

/// Signing secret used by every test configuration.
pub const TEST_SECRET: &str = "test-signing-secret-do-not-use-in-production";

/// Base rate limit used by test configurations.
pub const TEST_RATE_LIMIT_REQUESTS: u32 = 10;

/// Window used by test configurations, in seconds.
pub const TEST_RATE_LIMIT_PERIOD_SECONDS: u64 = 60;

/// Fixed instant tests start from (2025-01-01T00:00:00Z).
pub fn fixed_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
        .single()
        .expect("fixed start time is valid")
}

/// Environment variables for a development configuration with small limits.
pub fn test_vars() -> HashMap<String, String> {
    HashMap::from([
        ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
        ("ENVIRONMENT".to_string(), "development".to_string()),
        ("SECRET_KEY".to_string(), TEST_SECRET.to_string()),
        (
            "RATE_LIMIT_REQUESTS".to_string(),
            TEST_RATE_LIMIT_REQUESTS.to_string(),
        ),
        (
            "RATE_LIMIT_PERIOD".to_string(),
            TEST_RATE_LIMIT_PERIOD_SECONDS.to_string(),
        ),
    ])
}

/// Test configuration.
pub fn test_config() -> Config {
    test_config_with(&[])
}

/// Test configuration with overrides applied on top of `test_vars`.
pub fn test_config_with(overrides: &[(&str, &str)]) -> Config {
    let mut vars = test_vars();
    for (name, value) in overrides {
        vars.insert((*name).to_string(), (*value).to_string());
    }
    Config::from_vars(&vars).expect("test configuration should load")
}
