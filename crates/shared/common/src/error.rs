//! Unified error handling for the SSO core and its gRPC transport.
//!
//! `AppError` is the only error type in the authentication service's public
//! contract. Storage, hashing and token failures are classified into one of
//! these kinds before they leave the service.

use domain::DomainError;
use thiserror::Error;
use tonic::Status;

/// Message returned for every failed login, whatever the cause.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "invalid email or password";

/// Application error kinds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    // Caller input
    #[error("{0}")]
    InvalidArgument(String),

    // Authentication
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User already exists")]
    UserAlreadyExists,

    #[error("User not found")]
    UserNotFound,

    // Data integrity & token lifecycle
    #[error("Stored password hash is malformed")]
    MalformedHash,

    #[error("Token signature is invalid")]
    BadSignature,

    #[error("Token has expired")]
    Expired,

    #[error("Token has been revoked")]
    Revoked,

    // Transient
    #[error("{0}: deadline exceeded")]
    Timeout(String),

    #[error("{0}: cancelled")]
    Cancelled(String),

    // Fatal configuration
    #[error("Signing key unavailable")]
    SigningUnavailable,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Timeout(_) | AppError::Cancelled(_))
    }

    /// gRPC status code for this error kind.
    pub fn grpc_code(&self) -> tonic::Code {
        match self {
            AppError::InvalidArgument(_) => tonic::Code::InvalidArgument,
            AppError::InvalidCredentials
            | AppError::BadSignature
            | AppError::Expired
            | AppError::Revoked => tonic::Code::Unauthenticated,
            AppError::UserAlreadyExists => tonic::Code::AlreadyExists,
            AppError::UserNotFound => tonic::Code::NotFound,
            AppError::Timeout(_) | AppError::Cancelled(_) => tonic::Code::DeadlineExceeded,
            AppError::MalformedHash | AppError::SigningUnavailable | AppError::Internal(_) => {
                tonic::Code::Internal
            }
        }
    }

    /// Get user-facing message (hides internal details)
    pub fn user_message(&self) -> String {
        match self {
            AppError::InvalidArgument(msg) => msg.clone(),
            AppError::InvalidCredentials => INVALID_CREDENTIALS_MESSAGE.to_string(),

            // Hide details for internal errors
            AppError::MalformedHash => {
                tracing::error!("Stored password hash is malformed");
                "An internal error occurred".to_string()
            }
            AppError::SigningUnavailable => {
                tracing::error!("Token signing key unavailable");
                "An internal error occurred".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }

            _ => self.to_string(),
        }
    }
}

// =============================================================================
// gRPC Status (Tonic)
// =============================================================================

impl From<AppError> for Status {
    fn from(err: AppError) -> Self {
        Status::new(err.grpc_code(), err.user_message())
    }
}

// =============================================================================
// Domain Error Conversion
// =============================================================================

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::MalformedHash => AppError::MalformedHash,
            DomainError::Hashing(msg) => AppError::Internal(msg),
            DomainError::WorkFactor(msg) => AppError::Internal(msg),
        }
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Convenience constructors
impl AppError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        AppError::InvalidArgument(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    pub fn timeout(op: impl Into<String>) -> Self {
        AppError::Timeout(op.into())
    }

    pub fn cancelled(op: impl Into<String>) -> Self {
        AppError::Cancelled(op.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::invalid_argument("email is required"), tonic::Code::InvalidArgument),
            (AppError::InvalidCredentials, tonic::Code::Unauthenticated),
            (AppError::UserAlreadyExists, tonic::Code::AlreadyExists),
            (AppError::UserNotFound, tonic::Code::NotFound),
            (AppError::timeout("auth.login"), tonic::Code::DeadlineExceeded),
            (AppError::cancelled("auth.login"), tonic::Code::DeadlineExceeded),
            (AppError::SigningUnavailable, tonic::Code::Internal),
            (AppError::internal("boom"), tonic::Code::Internal),
            (AppError::Revoked, tonic::Code::Unauthenticated),
        ];

        for (err, code) in cases {
            assert_eq!(Status::from(err).code(), code);
        }
    }

    #[test]
    fn test_invalid_credentials_message_is_generic() {
        let status = Status::from(AppError::InvalidCredentials);
        assert_eq!(status.message(), INVALID_CREDENTIALS_MESSAGE);
    }

    #[test]
    fn test_internal_details_hidden() {
        let status = Status::from(AppError::internal("connection refused to 10.0.0.3"));
        assert!(!status.message().contains("10.0.0.3"));
    }

    #[test]
    fn test_invalid_argument_message_is_specific() {
        let status = Status::from(AppError::invalid_argument("email is required"));
        assert_eq!(status.message(), "email is required");
    }

    #[test]
    fn test_domain_error_conversion() {
        assert_eq!(AppError::from(DomainError::MalformedHash), AppError::MalformedHash);
        assert!(matches!(
            AppError::from(DomainError::WorkFactor("m_cost too small".into())),
            AppError::Internal(_)
        ));
    }

    #[test]
    fn test_only_transient_errors_are_retryable() {
        assert!(AppError::timeout("op").is_retryable());
        assert!(AppError::cancelled("op").is_retryable());
        assert!(!AppError::InvalidCredentials.is_retryable());
        assert!(!AppError::SigningUnavailable.is_retryable());
    }
}
