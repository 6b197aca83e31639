//! Repository contracts the authentication service depends on.
//!
//! The service only sees these capability traits; concrete engines
//! ([`InMemoryStore`], [`SqlStore`]) are injected at construction.

pub mod entities;
mod memory;
mod sql_store;

use async_trait::async_trait;
use thiserror::Error;

use domain::{App, AppId, User, UserId};

pub use memory::InMemoryStore;
pub use sql_store::SqlStore;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Storage failures reported by repository implementations.
///
/// `Backend` carries engine-specific errors; the auth service never lets it
/// escape its public contract.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("record not found")]
    NotFound,

    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StorageError {
    pub fn backend(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        StorageError::Backend(err.into())
    }
}

/// Result type alias for repository operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Write path for new users.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserWriter: Send + Sync {
    /// Insert a user and return its id.
    ///
    /// Must be atomic with respect to email uniqueness: of concurrent saves
    /// for the same (case-folded) email exactly one succeeds and the others
    /// fail with [`StorageError::DuplicateEmail`].
    async fn save_user(&self, email: &str, password_hash: &str) -> StorageResult<UserId>;
}

/// Read path for users.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserReader: Send + Sync {
    /// Find a user by email, compared case-insensitively.
    async fn find_by_email(&self, email: &str) -> StorageResult<User>;

    /// Look up the admin flag of a user.
    async fn is_admin(&self, user_id: UserId) -> StorageResult<bool>;
}

/// Read path for applications.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait AppReader: Send + Sync {
    async fn find_by_id(&self, app_id: AppId) -> StorageResult<App>;
}
