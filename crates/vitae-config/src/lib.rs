//! # Vitae Config
//!
//! Configuration management for the Vitae session layer.
//! Supports layered configuration from files, `.env` and environment
//! variables, validated once at startup.

mod app_config;
mod environment;
mod loader;
mod validation;

pub use app_config::*;
pub use environment::*;
pub use loader::*;
pub use validation::*;
