//! Authentication flows against the SeaORM store on in-memory SQLite.

use std::sync::Arc;

use chrono::Duration;
use futures::future::join_all;

use auth_service_lib::infra::Database;
use auth_service_lib::repository::SqlStore;
use auth_service_lib::revocation::MemoryRevocations;
use auth_service_lib::service::{AuthService, AuthSettings, Authenticator};
use auth_service_lib::RequestContext;
use common::AppError;
use domain::{App, UserRole, WorkFactor};

async fn setup() -> (Arc<SqlStore>, Arc<Authenticator>) {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    let store = Arc::new(SqlStore::new(db.get_connection()));
    store
        .insert_app(&App::new(1, "web", "web-secret"))
        .await
        .unwrap();

    let settings = AuthSettings {
        token_ttl: Duration::minutes(10),
        work_factor: WorkFactor::minimal(),
    };
    let auth = Authenticator::from_store(store.clone(), Arc::new(MemoryRevocations::new()), settings)
        .unwrap();
    (store, Arc::new(auth))
}

#[tokio::test]
async fn test_sql_register_login_validate() {
    let (_, auth) = setup().await;
    let ctx = RequestContext::background();

    let id = auth
        .register(&ctx, "Alice@Example.com", "correcthorse")
        .await
        .unwrap();
    let token = auth
        .login(&ctx, "alice@example.com", "correcthorse", 1)
        .await
        .unwrap();

    let claims = auth.validate_token(&ctx, &token).await.unwrap();
    assert_eq!(claims.uid, id);
    assert_eq!(claims.email, "Alice@Example.com");
}

#[tokio::test]
async fn test_sql_unique_email_under_contention() {
    let (_, auth) = setup().await;

    let results = join_all((0..8).map(|_| {
        let auth = auth.clone();
        async move {
            auth.register(&RequestContext::background(), "race@example.com", "pw")
                .await
        }
    }))
    .await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter(|r| r.is_err())
        .all(|r| matches!(r, Err(AppError::UserAlreadyExists))));
}

#[tokio::test]
async fn test_sql_admin_role() {
    let (store, auth) = setup().await;
    let ctx = RequestContext::background();
    let id = auth.register(&ctx, "root@example.com", "pw").await.unwrap();

    assert_eq!(auth.is_admin(&ctx, id).await, Ok(false));
    store.set_role(id, UserRole::Admin).await.unwrap();
    assert_eq!(auth.is_admin(&ctx, id).await, Ok(true));
    assert_eq!(auth.is_admin(&ctx, id + 100).await, Err(AppError::UserNotFound));
}
