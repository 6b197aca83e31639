//! Authentication service - registration, login, privilege lookup, logout.
//!
//! Each call is a stateless request/response. Failures are classified into
//! `AppError` kinds here; raw storage errors never leave this module.
//!
//! Login failures are deliberately uniform: unknown email, wrong password and
//! unknown app id all surface as `InvalidCredentials`, and the cause is only
//! logged.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::{error, info, info_span, warn, Instrument, Span};

use common::{AppError, AppResult};
use domain::{AppId, CredentialHasher, DomainError, UserId, WorkFactor, DEFAULT_TOKEN_TTL_SECONDS};

use crate::context::RequestContext;
use crate::repository::{AppReader, StorageError, UserReader, UserWriter};
use crate::revocation::RevocationStore;
use crate::token::{Claims, TokenIssuer};

/// Authentication service trait for dependency injection.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Register a new user and return its id
    async fn register(&self, ctx: &RequestContext, email: &str, password: &str)
        -> AppResult<UserId>;

    /// Verify credentials and return a token scoped to `app_id`
    async fn login(
        &self,
        ctx: &RequestContext,
        email: &str,
        password: &str,
        app_id: AppId,
    ) -> AppResult<String>;

    /// Whether the user holds the admin role
    async fn is_admin(&self, ctx: &RequestContext, user_id: UserId) -> AppResult<bool>;

    /// Verify a token issued by this service and return its claims
    async fn validate_token(&self, ctx: &RequestContext, token: &str) -> AppResult<Claims>;

    /// Revoke a token for the rest of its lifetime
    async fn logout(&self, ctx: &RequestContext, token: &str) -> AppResult<bool>;
}

/// Tunables handed to the service at construction.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub token_ttl: Duration,
    pub work_factor: WorkFactor,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            token_ttl: Duration::seconds(DEFAULT_TOKEN_TTL_SECONDS),
            work_factor: WorkFactor::default(),
        }
    }
}

/// Concrete implementation of AuthService over the repository contracts.
pub struct Authenticator {
    user_writer: Arc<dyn UserWriter>,
    user_reader: Arc<dyn UserReader>,
    app_reader: Arc<dyn AppReader>,
    revocations: Arc<dyn RevocationStore>,
    hasher: Arc<CredentialHasher>,
    issuer: TokenIssuer,
    token_ttl: Duration,
    span: Span,
}

impl Authenticator {
    /// Create new auth service instance
    ///
    /// # Errors
    /// Returns `Internal` if the configured work factor is rejected or the
    /// token lifetime is not positive.
    pub fn new(
        user_writer: Arc<dyn UserWriter>,
        user_reader: Arc<dyn UserReader>,
        app_reader: Arc<dyn AppReader>,
        revocations: Arc<dyn RevocationStore>,
        settings: AuthSettings,
    ) -> AppResult<Self> {
        if settings.token_ttl <= Duration::zero() {
            return Err(AppError::internal(format!(
                "token lifetime must be positive, got {}s",
                settings.token_ttl.num_seconds()
            )));
        }

        let hasher = CredentialHasher::new(settings.work_factor)?;

        Ok(Self {
            user_writer,
            user_reader,
            app_reader,
            revocations,
            hasher: Arc::new(hasher),
            issuer: TokenIssuer::new(),
            token_ttl: settings.token_ttl,
            span: info_span!("auth_service"),
        })
    }

    /// Build from a single store implementing all three contracts.
    pub fn from_store<S>(
        store: Arc<S>,
        revocations: Arc<dyn RevocationStore>,
        settings: AuthSettings,
    ) -> AppResult<Self>
    where
        S: UserWriter + UserReader + AppReader + 'static,
    {
        Self::new(store.clone(), store.clone(), store, revocations, settings)
    }

    /// Parent span for every operation's span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    async fn hash_password(&self, password: &str) -> AppResult<String> {
        let hasher = self.hasher.clone();
        let password = password.to_owned();

        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::internal(format!("hashing task failed: {}", e)))?
            .map_err(AppError::from)
    }

    async fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
        let hasher = self.hasher.clone();
        let password = password.to_owned();
        let hash = hash.to_owned();

        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AppError::internal(format!("verification task failed: {}", e)))?
            .map_err(|e| match e {
                DomainError::MalformedHash => AppError::MalformedHash,
                other => AppError::from(other),
            })
    }

    async fn burn_decoy(&self, password: &str) {
        let hasher = self.hasher.clone();
        let password = password.to_owned();

        if let Err(e) = tokio::task::spawn_blocking(move || hasher.verify_decoy(&password)).await {
            warn!(error = %e, "decoy verification task failed");
        }
    }

    /// Shared by `validate_token` and `logout`.
    async fn check_token(&self, ctx: &RequestContext, op: &str, token: &str) -> AppResult<Claims> {
        let app_id = self.issuer.scope_of(token)?;

        let app = match ctx.run(op, self.app_reader.find_by_id(app_id)).await? {
            Ok(app) => app,
            // No key can verify a token for an app we don't know
            Err(StorageError::NotFound) => {
                warn!(app_id, "token scoped to unknown app");
                return Err(AppError::BadSignature);
            }
            Err(e) => return Err(storage_failure(op, "failed to get app", e)),
        };

        let claims = self.issuer.validate(token, &app)?;

        if ctx.run(op, self.revocations.is_revoked(&claims.jti)).await?? {
            return Err(AppError::Revoked);
        }

        Ok(claims)
    }
}

/// Log an engine failure and re-classify it without engine details.
fn storage_failure(op: &str, what: &str, err: StorageError) -> AppError {
    error!(op, error = %err, "{}", what);
    AppError::internal(format!("{}: {}", op, what))
}

#[async_trait]
impl AuthService for Authenticator {
    async fn register(
        &self,
        ctx: &RequestContext,
        email: &str,
        password: &str,
    ) -> AppResult<UserId> {
        const OP: &str = "auth.register";
        let span = info_span!(parent: &self.span, "register", op = OP);

        async {
            let email = email.trim();
            if email.is_empty() {
                return Err(AppError::invalid_argument("email is required"));
            }
            if password.is_empty() {
                return Err(AppError::invalid_argument("password is required"));
            }

            info!(email, "registering user");

            let password_hash = self.hash_password(password).await?;

            match ctx.run(OP, self.user_writer.save_user(email, &password_hash)).await? {
                Ok(id) => {
                    info!(user_id = id, "user registered");
                    Ok(id)
                }
                Err(StorageError::DuplicateEmail) => {
                    warn!(email, "email already registered");
                    Err(AppError::UserAlreadyExists)
                }
                Err(e) => Err(storage_failure(OP, "failed to save user", e)),
            }
        }
        .instrument(span)
        .await
    }

    async fn login(
        &self,
        ctx: &RequestContext,
        email: &str,
        password: &str,
        app_id: AppId,
    ) -> AppResult<String> {
        const OP: &str = "auth.login";
        let span = info_span!(parent: &self.span, "login", op = OP, app_id);

        async {
            info!(email, "attempting to login user");

            let user = match ctx.run(OP, self.user_reader.find_by_email(email)).await? {
                Ok(user) => user,
                Err(StorageError::NotFound) => {
                    self.burn_decoy(password).await;
                    warn!(email, "user not found");
                    return Err(AppError::InvalidCredentials);
                }
                Err(e) => return Err(storage_failure(OP, "failed to get user", e)),
            };

            match self.verify_password(password, &user.password_hash).await {
                Ok(true) => {}
                Ok(false) => {
                    warn!(user_id = user.id, "invalid password");
                    return Err(AppError::InvalidCredentials);
                }
                Err(e) => {
                    error!(user_id = user.id, error = %e, "failed to verify password");
                    return Err(e);
                }
            }

            let app = match ctx.run(OP, self.app_reader.find_by_id(app_id)).await? {
                Ok(app) => app,
                Err(StorageError::NotFound) => {
                    warn!("app not found");
                    return Err(AppError::InvalidCredentials);
                }
                Err(e) => return Err(storage_failure(OP, "failed to get app", e)),
            };

            let issued = self
                .issuer
                .issue(&user, &app, self.token_ttl)
                .map_err(|e| {
                    error!(error = %e, "failed to generate token");
                    AppError::from(e)
                })?;

            info!(user_id = user.id, "user logged in");
            Ok(issued.token)
        }
        .instrument(span)
        .await
    }

    async fn is_admin(&self, ctx: &RequestContext, user_id: UserId) -> AppResult<bool> {
        const OP: &str = "auth.is_admin";
        let span = info_span!(parent: &self.span, "is_admin", op = OP, user_id);

        async {
            match ctx.run(OP, self.user_reader.is_admin(user_id)).await? {
                Ok(is_admin) => {
                    info!(is_admin, "checked admin flag");
                    Ok(is_admin)
                }
                Err(StorageError::NotFound) => Err(AppError::UserNotFound),
                Err(e) => Err(storage_failure(OP, "failed to check admin flag", e)),
            }
        }
        .instrument(span)
        .await
    }

    async fn validate_token(&self, ctx: &RequestContext, token: &str) -> AppResult<Claims> {
        const OP: &str = "auth.validate_token";
        let span = info_span!(parent: &self.span, "validate_token", op = OP);

        self.check_token(ctx, OP, token).instrument(span).await
    }

    async fn logout(&self, ctx: &RequestContext, token: &str) -> AppResult<bool> {
        const OP: &str = "auth.logout";
        let span = info_span!(parent: &self.span, "logout", op = OP);

        async {
            let claims = self.check_token(ctx, OP, token).await?;
            let ttl = claims.remaining_lifetime(Utc::now());

            ctx.run(OP, self.revocations.revoke(&claims.jti, ttl)).await??;

            info!(user_id = claims.uid, app_id = claims.app_id, "token revoked");
            Ok(true)
        }
        .instrument(span)
        .await
    }
}
