//! Domain layer - Core SSO entities and the credential hasher.
//!
//! This crate contains pure domain logic with no infrastructure dependencies.
//! Users, applications (tenants) and password hashing live here so every
//! service shares one definition of them.

pub mod app;
pub mod constants;
pub mod error;
pub mod password;
pub mod user;

pub use app::{App, AppId};
pub use constants::*;
pub use error::{DomainError, DomainResult};
pub use password::{CredentialHasher, WorkFactor};
pub use user::{normalize_email, User, UserId, UserRole};
