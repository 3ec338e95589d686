//! crates/domains/src/lib.rs
//!
//! Entities, error kinds and port traits of the forum, plus the pure
//! post-tree algorithms every store must agree with.

pub mod errors;
pub mod listing;
pub mod models;
pub mod ports;
pub mod tree;

// Re-exporting for easier access in other crates
pub use errors::*;
pub use listing::*;
pub use models::*;
pub use ports::*;
