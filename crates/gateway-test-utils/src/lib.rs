//! # Gateway Test Utilities
//!
//! Shared test utilities for the gateway service.
//!
//! This crate provides:
//! - Deterministic fixtures (fixed secret, fixed start time, test config)
//! - Token builders for hand-crafted claim sets
//! - Server test harness (`TestGatewayServer` for E2E tests)
//! - Custom assertions (`TokenAssertions` trait)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gateway_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let server = TestGatewayServer::spawn().await?;
//!     let token = server.issue_token("alice", None, Some("pro"))?;
//!
//!     token.assert_valid_jwt().assert_for_subject("alice");
//!
//!     let response = reqwest::Client::new()
//!         .get(format!("{}/api/v1/me", server.url()))
//!         .bearer_auth(&token)
//!         .send()
//!         .await?;
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod assertions;
pub mod fixtures;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use assertions::*;
pub use fixtures::*;
pub use server_harness::*;
pub use token_builders::*;
