//! gRPC implementation for the SSO `Auth` service.
//!
//! Checks that required fields are present, derives the request deadline
//! from `grpc-timeout`, calls the core and maps `AppError` to `Status`.

use std::sync::Arc;
use std::time::Duration;

use tonic::{Request, Response, Status};

use crate::context::RequestContext;
use crate::service::AuthService;
use proto::sso::{
    auth_server::Auth, IsAdminRequest, IsAdminResponse, LoginRequest, LoginResponse,
    LogoutRequest, LogoutResponse, RegisterRequest, RegisterResponse, ValidateTokenRequest,
    ValidateTokenResponse,
};

const EMPTY_ID: i64 = 0;

/// gRPC service wrapper for AuthService.
pub struct AuthGrpcService {
    service: Arc<dyn AuthService>,
    request_timeout: Duration,
}

impl AuthGrpcService {
    /// Create a new gRPC service wrapper.
    ///
    /// `request_timeout` is the deadline used when the client sends none,
    /// and the upper bound when it does.
    pub fn new(service: Arc<dyn AuthService>, request_timeout: Duration) -> Self {
        Self {
            service,
            request_timeout,
        }
    }

    fn context_for<T>(&self, request: &Request<T>) -> RequestContext {
        let timeout = request
            .metadata()
            .get("grpc-timeout")
            .and_then(|value| value.to_str().ok())
            .and_then(parse_grpc_timeout)
            .map_or(self.request_timeout, |t| t.min(self.request_timeout));

        RequestContext::with_timeout(timeout)
    }
}

/// Parse a `grpc-timeout` header value (`<digits><unit>`, unit one of
/// `H M S m u n`).
pub fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    if value.len() < 2 || value.len() > 9 || !value.is_ascii() {
        return None;
    }

    let (digits, unit) = value.split_at(value.len() - 1);
    let amount: u64 = digits.parse().ok()?;

    match unit {
        "H" => Some(Duration::from_secs(amount * 3600)),
        "M" => Some(Duration::from_secs(amount * 60)),
        "S" => Some(Duration::from_secs(amount)),
        "m" => Some(Duration::from_millis(amount)),
        "u" => Some(Duration::from_micros(amount)),
        "n" => Some(Duration::from_nanos(amount)),
        _ => None,
    }
}

fn require(value: &str, field: &str) -> Result<(), Status> {
    if value.is_empty() {
        return Err(Status::invalid_argument(format!("{} is required", field)));
    }
    Ok(())
}

#[tonic::async_trait]
impl Auth for AuthGrpcService {
    async fn register(
        &self,
        request: Request<RegisterRequest>,
    ) -> Result<Response<RegisterResponse>, Status> {
        let ctx = self.context_for(&request);
        let req = request.into_inner();

        require(req.email.trim(), "email")?;
        require(&req.password, "password")?;

        let user_id = self
            .service
            .register(&ctx, &req.email, &req.password)
            .await
            .map_err(Status::from)?;

        Ok(Response::new(RegisterResponse { user_id }))
    }

    async fn login(
        &self,
        request: Request<LoginRequest>,
    ) -> Result<Response<LoginResponse>, Status> {
        let ctx = self.context_for(&request);
        let req = request.into_inner();

        require(req.email.trim(), "email")?;
        require(&req.password, "password")?;
        if req.app_id == 0 {
            return Err(Status::invalid_argument("app_id is required"));
        }

        let token = self
            .service
            .login(&ctx, &req.email, &req.password, req.app_id)
            .await
            .map_err(Status::from)?;

        Ok(Response::new(LoginResponse { token }))
    }

    async fn is_admin(
        &self,
        request: Request<IsAdminRequest>,
    ) -> Result<Response<IsAdminResponse>, Status> {
        let ctx = self.context_for(&request);
        let req = request.into_inner();

        if req.user_id == EMPTY_ID {
            return Err(Status::invalid_argument("user_id is required"));
        }

        let is_admin = self
            .service
            .is_admin(&ctx, req.user_id)
            .await
            .map_err(Status::from)?;

        Ok(Response::new(IsAdminResponse { is_admin }))
    }

    async fn logout(
        &self,
        request: Request<LogoutRequest>,
    ) -> Result<Response<LogoutResponse>, Status> {
        let ctx = self.context_for(&request);
        let req = request.into_inner();

        require(&req.token, "token")?;

        let success = self
            .service
            .logout(&ctx, &req.token)
            .await
            .map_err(Status::from)?;

        Ok(Response::new(LogoutResponse { success }))
    }

    async fn validate_token(
        &self,
        request: Request<ValidateTokenRequest>,
    ) -> Result<Response<ValidateTokenResponse>, Status> {
        let ctx = self.context_for(&request);
        let req = request.into_inner();

        require(&req.token, "token")?;

        let claims = self
            .service
            .validate_token(&ctx, &req.token)
            .await
            .map_err(Status::from)?;

        Ok(Response::new(ValidateTokenResponse {
            user_id: claims.uid,
            app_id: claims.app_id,
            email: claims.email,
            issued_at: claims.iat,
            expires_at: claims.exp,
        }))
    }
}
