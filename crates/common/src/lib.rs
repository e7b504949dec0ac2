//! Common utilities and types shared across the AI gateway crates.

#![warn(clippy::pedantic)]

/// Module for time sources used by token and rate-limit logic
pub mod clock;

/// Module for JWT utilities (claims, algorithms, constants)
pub mod jwt;

/// Module for secret types that prevent accidental logging
pub mod secret;
