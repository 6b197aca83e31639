//! gRPC protocol buffer definitions.
//!
//! Generated service definitions for the SSO `Auth` service
//! (register, login, is-admin, logout, token validation).

/// SSO service definitions.
pub mod sso {
    tonic::include_proto!("sso");
}

// Re-export commonly used items
pub use sso::auth_client::AuthClient;
pub use sso::auth_server::{Auth, AuthServer};
