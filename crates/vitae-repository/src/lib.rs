//! # Vitae Repository
//!
//! Persistent session storage.
//!
//! ```text
//! Service
//!   ↓  Arc<dyn SessionStore>   (store contract)
//! MySqlSessionStore            (SQLx / MySQL)
//!   ↓  Arc<DatabasePool>
//! MySQL
//! ```
//!
//! [`InMemorySessionStore`] implements the same contract without a database
//! and is used by the service and HTTP test suites.

pub mod memory;
pub mod mysql;
pub mod pool;
pub mod traits;

pub use memory::InMemorySessionStore;
pub use mysql::*;
pub use pool::*;
pub use traits::*;
