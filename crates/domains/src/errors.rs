//! # DomainError
//!
//! Centralized error kinds for the forum core. Adapters translate these into
//! transport codes; nothing in this crate knows about HTTP.

use thiserror::Error;

/// The primary error type for all domain and service operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed input (e.g. empty author, unparseable limit).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Referenced user, forum, thread or post is absent.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// Parent post absent or in another thread; uniqueness violation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Unexpected persistence failure. Never retried internally.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// A specialized Result type for forum logic.
pub type DomainResult<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_entity_and_key() {
        let err = DomainError::not_found("user", "ghost");
        assert_eq!(err.to_string(), "user not found: ghost");
    }

    #[test]
    fn conflict_message() {
        assert_eq!(
            DomainError::conflict("parent 7 is in thread 2").to_string(),
            "conflict: parent 7 is in thread 2"
        );
    }
}
