//! Data Transfer Objects for the HTTP layer.

mod session_dto;

pub use session_dto::*;
