//! # Vitae Service
//!
//! Session resolution and token lifecycle.
//!
//! Components, leaves first:
//!
//! - [`ExpiryPolicy`]: pure expiry checks and lifetime arithmetic.
//! - [`SessionCache`]: in-process token → session map with a cache TTL.
//! - [`TokenCleanupService`]: best-effort deletion of expired tokens.
//! - [`SweepScheduler`]: periodic cleanup task with graceful stop.
//! - [`SessionResolver`]: per-request cache → store resolution.

pub mod dto;
pub mod metrics;
pub mod session;

pub use dto::*;
pub use session::*;
