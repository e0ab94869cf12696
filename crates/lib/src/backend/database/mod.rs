//! Database-style backend implementations
//!
//! These backends provide persistent, queryable storage similar to traditional databases.

mod in_memory;
#[cfg(any(feature = "sqlite", feature = "postgres"))]
pub mod sql;

pub use in_memory::InMemory;
#[cfg(any(feature = "sqlite", feature = "postgres"))]
pub use sql::SqlxBackend;
