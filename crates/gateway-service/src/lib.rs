//! AI Gateway Service Library
//!
//! Request authorization and rate limiting in front of the gateway's
//! provider-facing handlers.
//!
//! # Modules
//!
//! - `config` - Service configuration
//! - `crypto` - Token authority (JWT issuance and verification)
//! - `errors` - Error types and HTTP mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Admission, response headers, HTTP metrics
//! - `models` - Resolved identities and response bodies
//! - `observability` - Metrics and log correlation helpers
//! - `routes` - Router and application state
//! - `services` - Admission controller and sliding-window limiter
//! - `tasks` - Background tasks

pub mod config;
pub mod crypto;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;
pub mod tasks;
