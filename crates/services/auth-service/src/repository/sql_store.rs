//! SeaORM-backed implementation of the repository contracts.
//!
//! Works against Postgres or SQLite. Email uniqueness is enforced by the
//! unique index on `users.email_normalized`, so concurrent registrations are
//! resolved by the database rather than by a read-then-write check.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    SqlErr,
};

use domain::{normalize_email, App, AppId, User, UserId, UserRole, ROLE_USER};

use super::entities::{app, user};
use super::{AppReader, StorageError, StorageResult, UserReader, UserWriter};

/// Relational store for users and apps.
#[derive(Clone)]
pub struct SqlStore {
    db: DatabaseConnection,
}

impl SqlStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Insert an application record.
    ///
    /// App provisioning is an operator task; this exists for seeding and tests.
    pub async fn insert_app(&self, app: &App) -> StorageResult<()> {
        let model = app::ActiveModel {
            id: Set(app.id),
            name: Set(app.name.clone()),
            secret: Set(app.secret.clone()),
        };
        model.insert(&self.db).await.map_err(StorageError::backend)?;
        Ok(())
    }

    /// Change a user's role.
    pub async fn set_role(&self, user_id: UserId, role: UserRole) -> StorageResult<()> {
        let found = user::Entity::find_by_id(user_id)
            .one(&self.db)
            .await
            .map_err(StorageError::backend)?
            .ok_or(StorageError::NotFound)?;

        let mut active: user::ActiveModel = found.into();
        active.role = Set(role.to_string());
        active.update(&self.db).await.map_err(StorageError::backend)?;
        Ok(())
    }
}

fn classify_insert_error(err: DbErr) -> StorageError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => StorageError::DuplicateEmail,
        _ => StorageError::backend(err),
    }
}

#[async_trait]
impl UserWriter for SqlStore {
    async fn save_user(&self, email: &str, password_hash: &str) -> StorageResult<UserId> {
        let model = user::ActiveModel {
            email: Set(email.trim().to_string()),
            email_normalized: Set(normalize_email(email)),
            password_hash: Set(password_hash.to_string()),
            role: Set(ROLE_USER.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        let inserted = model.insert(&self.db).await.map_err(classify_insert_error)?;
        Ok(inserted.id)
    }
}

#[async_trait]
impl UserReader for SqlStore {
    async fn find_by_email(&self, email: &str) -> StorageResult<User> {
        user::Entity::find()
            .filter(user::Column::EmailNormalized.eq(normalize_email(email)))
            .one(&self.db)
            .await
            .map_err(StorageError::backend)?
            .map(User::from)
            .ok_or(StorageError::NotFound)
    }

    async fn is_admin(&self, user_id: UserId) -> StorageResult<bool> {
        let found = user::Entity::find_by_id(user_id)
            .one(&self.db)
            .await
            .map_err(StorageError::backend)?
            .ok_or(StorageError::NotFound)?;

        Ok(UserRole::from(found.role.as_str()).is_admin())
    }
}

#[async_trait]
impl AppReader for SqlStore {
    async fn find_by_id(&self, app_id: AppId) -> StorageResult<App> {
        app::Entity::find_by_id(app_id)
            .one(&self.db)
            .await
            .map_err(StorageError::backend)?
            .map(App::from)
            .ok_or(StorageError::NotFound)
    }
}
