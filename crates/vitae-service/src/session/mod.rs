//! Session cache and token lifecycle.

mod cache;
mod cleanup;
mod expiry;
mod resolver;
mod scheduler;

pub use cache::*;
pub use cleanup::*;
pub use expiry::*;
pub use resolver::*;
pub use scheduler::*;
