//! Result type aliases for Vitae.

use crate::VitaeError;

/// A specialized `Result` type for Vitae operations.
pub type VitaeResult<T> = Result<T, VitaeError>;
