//! crates/storage-adapters/src/lib.rs
//!
//! Implementations of the `domains` ports. The in-memory store is always
//! compiled; Postgres sits behind the `db-postgres` feature.

pub mod memory;

#[cfg(feature = "db-postgres")]
pub mod postgres;

pub use memory::MemoryStore;

#[cfg(feature = "db-postgres")]
pub use postgres::PgStore;
