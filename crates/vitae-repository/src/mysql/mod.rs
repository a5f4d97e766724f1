//! MySQL store implementations.

mod session_store;

pub use session_store::*;
