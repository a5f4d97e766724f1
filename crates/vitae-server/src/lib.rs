//! # Vitae Server Library
//!
//! Composition root of the Vitae session layer: builds the store, cache,
//! cleanup service, sweep scheduler and HTTP router from configuration and
//! owns their lifecycle.

pub mod app;
pub mod startup;

pub use app::*;
