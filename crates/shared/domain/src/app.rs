//! Application (tenant) entity.

use serde::{Deserialize, Serialize};

/// Numeric application identifier.
pub type AppId = i32;

/// A registered consumer of the SSO service.
///
/// Tokens are scoped to exactly one app and signed with its `secret`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    pub id: AppId,
    pub name: String,
    #[serde(skip_serializing)]
    pub secret: String,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl App {
    pub fn new(id: AppId, name: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            secret: secret.into(),
        }
    }

    /// Signing key material for tokens scoped to this app.
    pub fn secret_bytes(&self) -> &[u8] {
        self.secret.as_bytes()
    }
}
