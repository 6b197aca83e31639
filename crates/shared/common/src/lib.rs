//! Common utilities shared across the SSO services.
//!
//! This crate provides:
//! - The service error taxonomy and its gRPC status mapping
//! - Configuration structures

pub mod config;
pub mod error;

pub use config::*;
pub use error::{AppError, AppResult, INVALID_CREDENTIALS_MESSAGE};
