//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Session resolver — injects `CallerContext`, never rejects
//! 2. Audit logger — logs after resolution, has the caller id
//!
//! The login route additionally carries the per-email rate limiter.

pub mod audit;
pub mod auth;
pub mod rate;
