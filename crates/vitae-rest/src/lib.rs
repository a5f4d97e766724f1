//! # Vitae REST
//!
//! REST API layer using Axum for the Vitae session layer.
//! Provides the session status, logout, admin cleanup and health endpoints.

pub mod controllers;
pub mod cookies;
pub mod extractors;
pub mod middleware;
pub mod responses;
pub mod router;
pub mod state;

pub use router::*;
pub use state::*;
