//! Token issuer - signed, app-scoped access tokens (JWT, HS256).
//!
//! Each token is signed with the secret of the application it is scoped to,
//! so a token issued for one app never verifies against another.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use common::AppError;
use domain::{App, AppId, User, UserId};

/// JWT claims payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject user id
    pub uid: UserId,
    pub email: String,
    /// Scope: the app this token is valid for
    pub app_id: AppId,
    /// Token id, the revocation key
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// Time left before expiry, never below one second.
    pub fn remaining_lifetime(&self, now: DateTime<Utc>) -> std::time::Duration {
        let secs = (self.exp - now.timestamp()).max(1);
        std::time::Duration::from_secs(secs as u64)
    }
}

/// A freshly signed token together with the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

/// Token issuing and validation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("signing key unavailable")]
    SigningUnavailable,

    #[error("token expired")]
    Expired,

    #[error("token signature invalid")]
    BadSignature,

    #[error("token malformed")]
    Malformed,
}

pub type TokenResult<T> = Result<T, TokenError>;

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::SigningUnavailable => AppError::SigningUnavailable,
            TokenError::Expired => AppError::Expired,
            TokenError::BadSignature => AppError::BadSignature,
            TokenError::Malformed => AppError::invalid_argument("token is malformed"),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::BadSignature,
            _ => TokenError::Malformed,
        }
    }
}

/// Only the scope claim, read before the signing key is known.
#[derive(Deserialize)]
struct Scope {
    app_id: AppId,
}

/// Builds and checks app-scoped tokens.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    algorithm: Algorithm,
}

impl Default for TokenIssuer {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::HS256,
        }
    }
}

impl TokenIssuer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a token for `user` scoped to `app`, valid for `ttl`.
    pub fn issue(&self, user: &User, app: &App, ttl: Duration) -> TokenResult<IssuedToken> {
        self.issue_at(user, app, ttl, Utc::now())
    }

    /// Same as [`issue`](Self::issue) with an explicit issue time.
    pub fn issue_at(
        &self,
        user: &User,
        app: &App,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> TokenResult<IssuedToken> {
        if app.secret.is_empty() {
            return Err(TokenError::SigningUnavailable);
        }

        let issued_at = now.timestamp();
        let claims = Claims {
            uid: user.id,
            email: user.email.clone(),
            app_id: app.id,
            jti: Uuid::new_v4().to_string(),
            iat: issued_at,
            exp: issued_at + ttl.num_seconds(),
        };

        let token = encode(
            &Header::new(self.algorithm),
            &claims,
            &EncodingKey::from_secret(app.secret_bytes()),
        )
        .map_err(|_| TokenError::SigningUnavailable)?;

        Ok(IssuedToken { token, claims })
    }

    /// Read the scope claim without checking the signature.
    ///
    /// Only used to pick the app whose key verifies the token; never trust
    /// anything else from an unverified token.
    pub fn scope_of(&self, token: &str) -> TokenResult<AppId> {
        let mut validation = Validation::new(self.algorithm);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = decode::<Scope>(token, &DecodingKey::from_secret(&[]), &validation)
            .map_err(|_| TokenError::Malformed)?;
        Ok(data.claims.app_id)
    }

    /// Verify signature and expiry against `app`'s secret.
    pub fn validate(&self, token: &str, app: &App) -> TokenResult<Claims> {
        if app.secret.is_empty() {
            return Err(TokenError::SigningUnavailable);
        }

        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(app.secret_bytes()),
            &validation,
        )?;

        // Signed by this app's key but claiming another scope
        if data.claims.app_id != app.id {
            return Err(TokenError::BadSignature);
        }

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User::new(7, "alice@example.com".to_string(), "hash".to_string())
    }

    fn app() -> App {
        App::new(1, "web", "web-app-secret")
    }

    #[test]
    fn test_issue_and_validate() {
        let issuer = TokenIssuer::new();
        let issued = issuer.issue(&user(), &app(), Duration::hours(1)).unwrap();

        let claims = issuer.validate(&issued.token, &app()).unwrap();
        assert_eq!(claims.uid, 7);
        assert_eq!(claims.app_id, 1);
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(claims, issued.claims);
    }

    #[test]
    fn test_expired_token_rejected() {
        let issuer = TokenIssuer::new();
        let two_hours_ago = Utc::now() - Duration::hours(2);
        let issued = issuer
            .issue_at(&user(), &app(), Duration::hours(1), two_hours_ago)
            .unwrap();

        assert_eq!(issuer.validate(&issued.token, &app()), Err(TokenError::Expired));
    }

    #[test]
    fn test_token_for_other_app_rejected() {
        let issuer = TokenIssuer::new();
        let issued = issuer.issue(&user(), &app(), Duration::hours(1)).unwrap();
        let other = App::new(2, "mobile", "mobile-app-secret");

        assert_eq!(issuer.validate(&issued.token, &other), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_scope_claim_must_match_app() {
        let issuer = TokenIssuer::new();
        // Two apps sharing key material
        let shared = App::new(2, "mobile", "web-app-secret");
        let issued = issuer.issue(&user(), &shared, Duration::hours(1)).unwrap();

        assert_eq!(issuer.validate(&issued.token, &app()), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_tampered_claims_rejected() {
        let issuer = TokenIssuer::new();
        let genuine = issuer.issue(&user(), &app(), Duration::hours(1)).unwrap();

        let mut admin = user();
        admin.id = 1;
        let forged = issuer
            .issue(&admin, &App::new(1, "web", "attacker-secret"), Duration::hours(1))
            .unwrap();

        // Forged header+payload with the genuine signature
        let forged_parts: Vec<&str> = forged.token.split('.').collect();
        let genuine_sig = genuine.token.rsplit('.').next().unwrap();
        let spliced = format!("{}.{}.{}", forged_parts[0], forged_parts[1], genuine_sig);

        assert_eq!(issuer.validate(&spliced, &app()), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let issuer = TokenIssuer::new();
        assert_eq!(issuer.validate("not.a.token", &app()), Err(TokenError::Malformed));
        assert_eq!(issuer.scope_of("garbage"), Err(TokenError::Malformed));
    }

    #[test]
    fn test_empty_secret_cannot_sign() {
        let issuer = TokenIssuer::new();
        let keyless = App::new(3, "broken", "");

        let result = issuer.issue(&user(), &keyless, Duration::hours(1));
        assert!(matches!(result, Err(TokenError::SigningUnavailable)));
    }

    #[test]
    fn test_scope_of_reads_app_id() {
        let issuer = TokenIssuer::new();
        let issued = issuer.issue(&user(), &app(), Duration::hours(1)).unwrap();
        assert_eq!(issuer.scope_of(&issued.token), Ok(1));
    }

    #[test]
    fn test_each_token_has_unique_id() {
        let issuer = TokenIssuer::new();
        let a = issuer.issue(&user(), &app(), Duration::hours(1)).unwrap();
        let b = issuer.issue(&user(), &app(), Duration::hours(1)).unwrap();
        assert_ne!(a.claims.jti, b.claims.jti);
    }

    #[test]
    fn test_remaining_lifetime() {
        let issuer = TokenIssuer::new();
        let now = Utc::now();
        let issued = issuer.issue_at(&user(), &app(), Duration::minutes(10), now).unwrap();

        let remaining = issued.claims.remaining_lifetime(now + Duration::minutes(4));
        assert_eq!(remaining.as_secs(), 360);
        assert_eq!(issued.claims.remaining_lifetime(now + Duration::hours(1)).as_secs(), 1);
    }
}
