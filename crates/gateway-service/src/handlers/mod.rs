//! HTTP request handlers for the gateway.

pub mod health;
pub mod me;
pub mod metrics;

pub use health::{api_health, health_check};
pub use me::{admin_ping, get_me, premium_ping};
pub use metrics::metrics_handler;
