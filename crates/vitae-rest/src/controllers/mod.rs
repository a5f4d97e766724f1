//! REST API controllers.

pub mod admin_controller;
pub mod auth_controller;
pub mod health_controller;

pub use health_controller::*;
