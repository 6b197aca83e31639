//! Auth Service Library
//!
//! Single-sign-on core: registers users, verifies credentials and issues
//! signed tokens scoped to a client application, answers admin-privilege
//! lookups and revokes tokens on logout. Served over gRPC.

pub mod config;
pub mod context;
pub mod grpc;
pub mod infra;
pub mod repository;
pub mod revocation;
pub mod service;
pub mod token;

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Duration;
use tonic::transport::Server;
use tracing::info;

use crate::config::AuthServiceConfig;
use crate::grpc::AuthGrpcService;
use crate::infra::Database;
use crate::repository::SqlStore;
use crate::revocation::{MemoryRevocations, RedisRevocations, RevocationStore};
use crate::service::{AuthSettings, Authenticator};

pub use context::{CancelHandle, RequestContext};
pub use service::AuthService;

/// Run the auth service with configuration from the environment.
pub async fn run_embedded(host: &str, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let config = AuthServiceConfig::from_env();
    run_server_with_config(host, port, config).await
}

/// Run migrations (for CLI commands).
pub async fn run_migrations(action: MigrateAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = AuthServiceConfig::from_env();
    let db = Database::connect_without_migrations(&config.database).await?;

    match action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            for (name, applied) in status {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, name);
            }
        }
        MigrateAction::Fresh => {
            db.fresh_migrations().await?;
            info!("Database reset and migrations applied");
        }
    }

    Ok(())
}

/// Migration action type.
#[derive(Debug, Clone, Copy)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}

/// Wire the authentication service from configuration.
pub async fn build_service(
    config: &AuthServiceConfig,
) -> Result<Authenticator, Box<dyn std::error::Error>> {
    let db = Database::connect_with(&config.database).await?;
    let store = Arc::new(SqlStore::new(db.get_connection()));

    let revocations: Arc<dyn RevocationStore> = match &config.cache.url {
        Some(url) => Arc::new(RedisRevocations::connect(url).await?),
        None => {
            tracing::warn!("REDIS_URL not set, keeping revoked tokens in process memory");
            Arc::new(MemoryRevocations::new())
        }
    };

    let token_ttl = Duration::try_seconds(config.token.ttl_seconds)
        .ok_or_else(|| format!("token lifetime out of range: {}s", config.token.ttl_seconds))?;

    let settings = AuthSettings {
        token_ttl,
        work_factor: (&config.hashing).into(),
    };

    Ok(Authenticator::from_store(store, revocations, settings)?)
}

/// Run the gRPC server with the given configuration.
async fn run_server_with_config(
    host: &str,
    port: u16,
    config: AuthServiceConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let auth_service = Arc::new(build_service(&config).await?);

    // Create gRPC service
    let grpc_service = AuthGrpcService::new(auth_service, config.request_timeout);

    // Build address
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Auth service listening on {}", addr);

    // Run server until Ctrl+C
    Server::builder()
        .add_service(proto::AuthServer::new(grpc_service))
        .serve_with_shutdown(addr, shutdown_signal())
        .await?;

    info!("Auth service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Received shutdown signal, stopping gracefully...");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_memory_config(ttl_seconds: i64) -> AuthServiceConfig {
        let mut config = AuthServiceConfig::default();
        config.database.url = "sqlite::memory:".to_string();
        config.token.ttl_seconds = ttl_seconds;
        config
    }

    #[tokio::test]
    async fn test_build_service_with_defaults() {
        assert!(build_service(&in_memory_config(3600)).await.is_ok());
    }

    #[tokio::test]
    async fn test_build_service_rejects_out_of_range_ttl() {
        let result = build_service(&in_memory_config(i64::MAX)).await;
        let err = result.err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.contains("out of range"));
    }

    #[tokio::test]
    async fn test_build_service_rejects_negative_ttl() {
        assert!(build_service(&in_memory_config(-1)).await.is_err());
    }
}
