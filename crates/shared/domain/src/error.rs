//! Domain-level errors.
//!
//! These errors represent business rule violations and domain logic failures.
//! They are independent of infrastructure concerns (gRPC, database, cache).

use thiserror::Error;

/// Domain-specific errors for business rule violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Stored password hash could not be parsed (data corruption, not user error)
    #[error("Stored password hash is malformed")]
    MalformedHash,

    /// Hashing backend failed
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    /// Invalid work factor parameters
    #[error("Invalid work factor: {0}")]
    WorkFactor(String),
}

impl DomainError {
    /// Create a hashing error
    pub fn hashing(msg: impl Into<String>) -> Self {
        DomainError::Hashing(msg.into())
    }
}

/// Result type alias for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
