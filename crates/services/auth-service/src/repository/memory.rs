//! In-memory reference implementation of the repository contracts.
//!
//! Used by tests and local development. All state sits behind one mutex, so
//! the email check-and-insert in `save_user` is atomic.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use domain::{normalize_email, App, AppId, User, UserId, UserRole};

use super::{AppReader, StorageError, StorageResult, UserReader, UserWriter};

#[derive(Default)]
struct Inner {
    /// Keyed by normalized email
    users: HashMap<String, User>,
    apps: HashMap<AppId, App>,
    last_user_id: UserId,
}

/// Thread-safe in-memory store for users and apps.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style app registration for tests and seeding.
    pub fn with_app(self, app: App) -> Self {
        self.insert_app(app);
        self
    }

    pub fn insert_app(&self, app: App) {
        if let Ok(mut inner) = self.lock() {
            inner.apps.insert(app.id, app);
        }
    }

    /// Grant the admin role to an existing user.
    pub fn promote_to_admin(&self, user_id: UserId) -> StorageResult<()> {
        let mut inner = self.lock()?;
        let user = inner
            .users
            .values_mut()
            .find(|u| u.id == user_id)
            .ok_or(StorageError::NotFound)?;
        user.role = UserRole::Admin;
        Ok(())
    }

    /// Number of stored users.
    pub fn user_count(&self) -> usize {
        self.lock().map(|inner| inner.users.len()).unwrap_or(0)
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StorageError::backend("in-memory store lock poisoned"))
    }
}

#[async_trait]
impl UserWriter for InMemoryStore {
    async fn save_user(&self, email: &str, password_hash: &str) -> StorageResult<UserId> {
        let mut inner = self.lock()?;
        let key = normalize_email(email);

        if inner.users.contains_key(&key) {
            return Err(StorageError::DuplicateEmail);
        }

        inner.last_user_id += 1;
        let id = inner.last_user_id;
        inner.users.insert(
            key,
            User::new(id, email.trim().to_string(), password_hash.to_string()),
        );

        Ok(id)
    }
}

#[async_trait]
impl UserReader for InMemoryStore {
    async fn find_by_email(&self, email: &str) -> StorageResult<User> {
        self.lock()?
            .users
            .get(&normalize_email(email))
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn is_admin(&self, user_id: UserId) -> StorageResult<bool> {
        self.lock()?
            .users
            .values()
            .find(|u| u.id == user_id)
            .map(User::is_admin)
            .ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl AppReader for InMemoryStore {
    async fn find_by_id(&self, app_id: AppId) -> StorageResult<App> {
        self.lock()?
            .apps
            .get(&app_id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }
}
