//! End-to-end flows through the authentication service.

use std::sync::Arc;

use chrono::{Duration, Utc};
use futures::future::join_all;
use tokio_test::assert_ok;

use auth_service_lib::repository::InMemoryStore;
use auth_service_lib::revocation::MemoryRevocations;
use auth_service_lib::service::{AuthService, AuthSettings, Authenticator};
use auth_service_lib::token::TokenIssuer;
use auth_service_lib::RequestContext;
use common::AppError;
use domain::{App, User, WorkFactor};

const APP_ID: i32 = 1;
const APP_SECRET: &str = "web-secret";

fn setup() -> (Arc<InMemoryStore>, Arc<Authenticator>) {
    let store = Arc::new(
        InMemoryStore::new()
            .with_app(App::new(APP_ID, "web", APP_SECRET))
            .with_app(App::new(2, "mobile", "mobile-secret")),
    );
    let settings = AuthSettings {
        token_ttl: Duration::hours(1),
        work_factor: WorkFactor::minimal(),
    };
    let auth = Authenticator::from_store(store.clone(), Arc::new(MemoryRevocations::new()), settings)
        .expect("minimal work factor is valid");
    (store, Arc::new(auth))
}

fn ctx() -> RequestContext {
    RequestContext::background()
}

#[tokio::test]
async fn test_register_then_login_issues_scoped_token() {
    let (_, auth) = setup();

    let user_id = assert_ok!(auth.register(&ctx(), "alice@example.com", "correcthorse").await);
    assert!(user_id > 0);

    let token = assert_ok!(
        auth.login(&ctx(), "alice@example.com", "correcthorse", APP_ID)
            .await
    );

    let claims = assert_ok!(auth.validate_token(&ctx(), &token).await);
    assert_eq!(claims.uid, user_id);
    assert_eq!(claims.email, "alice@example.com");
    assert_eq!(claims.app_id, APP_ID);
    assert_eq!(claims.exp - claims.iat, 3600);
    assert!(!claims.jti.is_empty());
}

#[tokio::test]
async fn test_tokens_for_different_apps_carry_their_scope() {
    let (_, auth) = setup();
    auth.register(&ctx(), "alice@example.com", "correcthorse")
        .await
        .unwrap();

    let web = auth
        .login(&ctx(), "alice@example.com", "correcthorse", 1)
        .await
        .unwrap();
    let mobile = auth
        .login(&ctx(), "alice@example.com", "correcthorse", 2)
        .await
        .unwrap();

    assert_ne!(web, mobile);
    assert_eq!(auth.validate_token(&ctx(), &web).await.unwrap().app_id, 1);
    assert_eq!(auth.validate_token(&ctx(), &mobile).await.unwrap().app_id, 2);
}

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
    let (store, auth) = setup();
    auth.register(&ctx(), "alice@example.com", "correcthorse")
        .await
        .unwrap();

    let again = auth.register(&ctx(), "alice@example.com", "other").await;
    assert_eq!(again, Err(AppError::UserAlreadyExists));

    let shouting = auth.register(&ctx(), "ALICE@Example.com", "other").await;
    assert_eq!(shouting, Err(AppError::UserAlreadyExists));

    assert_eq!(store.user_count(), 1);
}

#[tokio::test]
async fn test_concurrent_registration_has_one_winner() {
    let (store, auth) = setup();
    let attempts = 16;

    let results = join_all((0..attempts).map(|_| {
        let auth = auth.clone();
        async move { auth.register(&ctx(), "race@example.com", "pw").await }
    }))
    .await;

    let winners = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(AppError::UserAlreadyExists)))
        .count();

    assert_eq!(winners, 1);
    assert_eq!(conflicts, attempts - 1);
    assert_eq!(store.user_count(), 1);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let (_, auth) = setup();
    auth.register(&ctx(), "alice@example.com", "correcthorse")
        .await
        .unwrap();

    let wrong_password = auth
        .login(&ctx(), "alice@example.com", "batterystaple", APP_ID)
        .await
        .unwrap_err();
    let unknown_user = auth
        .login(&ctx(), "bob@example.com", "correcthorse", APP_ID)
        .await
        .unwrap_err();
    let unknown_app = auth
        .login(&ctx(), "alice@example.com", "correcthorse", 99)
        .await
        .unwrap_err();

    assert_eq!(wrong_password, AppError::InvalidCredentials);
    assert_eq!(unknown_user, AppError::InvalidCredentials);
    assert_eq!(unknown_app, AppError::InvalidCredentials);
    assert_eq!(wrong_password.user_message(), unknown_user.user_message());
}

#[tokio::test]
async fn test_login_ignores_email_case() {
    let (_, auth) = setup();
    auth.register(&ctx(), "Alice@Example.com", "correcthorse")
        .await
        .unwrap();

    let token = auth
        .login(&ctx(), "alice@EXAMPLE.com", "correcthorse", APP_ID)
        .await
        .unwrap();

    // Stored spelling is kept
    let claims = auth.validate_token(&ctx(), &token).await.unwrap();
    assert_eq!(claims.email, "Alice@Example.com");
}

#[tokio::test]
async fn test_is_admin_follows_role() {
    let (store, auth) = setup();
    let user_id = auth
        .register(&ctx(), "alice@example.com", "correcthorse")
        .await
        .unwrap();

    assert_eq!(auth.is_admin(&ctx(), user_id).await, Ok(false));

    store.promote_to_admin(user_id).unwrap();
    assert_eq!(auth.is_admin(&ctx(), user_id).await, Ok(true));
}

#[tokio::test]
async fn test_is_admin_unknown_user() {
    let (_, auth) = setup();
    assert_eq!(auth.is_admin(&ctx(), 424242).await, Err(AppError::UserNotFound));
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let (_, auth) = setup();
    auth.register(&ctx(), "alice@example.com", "correcthorse")
        .await
        .unwrap();
    let token = auth
        .login(&ctx(), "alice@example.com", "correcthorse", APP_ID)
        .await
        .unwrap();

    assert_eq!(auth.logout(&ctx(), &token).await, Ok(true));
    assert_eq!(auth.validate_token(&ctx(), &token).await, Err(AppError::Revoked));
    assert_eq!(auth.logout(&ctx(), &token).await, Err(AppError::Revoked));
}

#[tokio::test]
async fn test_logout_leaves_other_sessions_alone() {
    let (_, auth) = setup();
    auth.register(&ctx(), "alice@example.com", "correcthorse")
        .await
        .unwrap();
    let first = auth
        .login(&ctx(), "alice@example.com", "correcthorse", APP_ID)
        .await
        .unwrap();
    let second = auth
        .login(&ctx(), "alice@example.com", "correcthorse", APP_ID)
        .await
        .unwrap();

    auth.logout(&ctx(), &first).await.unwrap();
    assert!(auth.validate_token(&ctx(), &second).await.is_ok());
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let (_, auth) = setup();
    let user_id = auth
        .register(&ctx(), "alice@example.com", "correcthorse")
        .await
        .unwrap();

    let user = User::new(user_id, "alice@example.com".to_string(), String::new());
    let app = App::new(APP_ID, "web", APP_SECRET);
    let stale = TokenIssuer::new()
        .issue_at(&user, &app, Duration::hours(1), Utc::now() - Duration::hours(2))
        .unwrap();

    assert_eq!(
        auth.validate_token(&ctx(), &stale.token).await,
        Err(AppError::Expired)
    );
    assert_eq!(auth.logout(&ctx(), &stale.token).await, Err(AppError::Expired));
}

#[tokio::test]
async fn test_foreign_and_tampered_tokens() {
    let (_, auth) = setup();
    let user = User::new(1, "alice@example.com".to_string(), String::new());

    // Signed with a key we never handed out
    let forged = TokenIssuer::new()
        .issue(&user, &App::new(APP_ID, "web", "not-the-secret"), Duration::hours(1))
        .unwrap();
    assert_eq!(
        auth.validate_token(&ctx(), &forged.token).await,
        Err(AppError::BadSignature)
    );

    // Scoped to an app that does not exist
    let orphan = TokenIssuer::new()
        .issue(&user, &App::new(77, "ghost", "ghost-secret"), Duration::hours(1))
        .unwrap();
    assert_eq!(
        auth.validate_token(&ctx(), &orphan.token).await,
        Err(AppError::BadSignature)
    );

    let garbage = auth.validate_token(&ctx(), "not.a.token").await;
    assert!(matches!(garbage, Err(AppError::InvalidArgument(_))));
}

#[tokio::test]
async fn test_cancelled_request_does_not_register() {
    let (store, auth) = setup();
    let (ctx, cancel) = RequestContext::background().cancellable();
    cancel.cancel();

    let result = auth.register(&ctx, "alice@example.com", "correcthorse").await;

    assert!(matches!(result, Err(AppError::Cancelled(_))));
    assert_eq!(store.user_count(), 0);
}
