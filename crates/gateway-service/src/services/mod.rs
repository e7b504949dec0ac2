//! Gateway services.
//!
//! - `admission` - identity resolution, quotas and role/plan gates
//! - `rate_limiter` - bounded sliding-window table

pub mod admission;
pub mod rate_limiter;

pub use admission::{AdmissionController, AnonymousPolicy};
pub use rate_limiter::{RateLimitKey, SlidingWindowLimiter};
