//! Secret types for protecting sensitive values from accidental logging.
//!
//! This module re-exports types from the [`secrecy`] crate. The gateway uses
//! them for the token signing secret and for bearer credentials held in
//! configuration or test fixtures.
//!
//! `SecretString` implements `Debug` with redaction, so any struct deriving
//! `Debug` that holds one is safe to log via `{:?}` or tracing. Secrets are
//! zeroized on drop.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct SigningConfig {
//!     algorithm: &'static str,
//!     secret: SecretString,
//! }
//!
//! let config = SigningConfig {
//!     algorithm: "HS256",
//!     secret: SecretString::from("change-me"),
//! };
//!
//! // Safe: the secret is redacted
//! println!("{:?}", config);
//!
//! // Reading the value is always explicit
//! let key_bytes: &[u8] = config.secret.expose_secret().as_bytes();
//! ```

// Re-export the main types from secrecy
pub use secrecy::{ExposeSecret, SecretString};
