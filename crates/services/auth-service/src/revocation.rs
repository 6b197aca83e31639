//! Token revocation list.
//!
//! Logout records the token id (`jti`) here for the rest of the token's
//! lifetime; validation rejects any token whose id is present. Entries expire
//! on their own once the token would have expired anyway.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisError};

use common::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Key prefix for revoked token ids in Redis
pub const REVOKED_KEY_PREFIX: &str = "sso:revoked:";

/// Storage for revoked token ids.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Mark `jti` revoked for `ttl`.
    async fn revoke(&self, jti: &str, ttl: Duration) -> AppResult<()>;

    /// Whether `jti` is currently revoked.
    async fn is_revoked(&self, jti: &str) -> AppResult<bool>;
}

// =============================================================================
// In-process
// =============================================================================

/// Revocation list kept in process memory.
///
/// Not shared between replicas; use [`RedisRevocations`] when running more
/// than one instance.
#[derive(Default)]
pub struct MemoryRevocations {
    entries: Mutex<HashMap<String, Instant>>,
}

impl MemoryRevocations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .map(|entries| {
                let now = Instant::now();
                entries.values().filter(|until| **until > now).count()
            })
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocations {
    async fn revoke(&self, jti: &str, ttl: Duration) -> AppResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| AppError::internal("revocation list lock poisoned"))?;

        let now = Instant::now();
        entries.retain(|_, until| *until > now);
        entries.insert(jti.to_string(), now + ttl);
        Ok(())
    }

    async fn is_revoked(&self, jti: &str) -> AppResult<bool> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| AppError::internal("revocation list lock poisoned"))?;

        Ok(entries
            .get(jti)
            .is_some_and(|until| *until > Instant::now()))
    }
}

// =============================================================================
// Redis
// =============================================================================

/// Revocation list in Redis, shared by every service instance.
#[derive(Clone)]
pub struct RedisRevocations {
    connection: ConnectionManager,
}

impl RedisRevocations {
    /// Connect to Redis.
    pub async fn connect(redis_url: &str) -> Result<Self, RedisError> {
        let client = Client::open(redis_url)?;
        let connection = ConnectionManager::new(client).await?;

        tracing::info!("Redis revocation list connected");

        Ok(Self { connection })
    }

    fn key(jti: &str) -> String {
        format!("{}{}", REVOKED_KEY_PREFIX, jti)
    }
}

fn cache_error(e: RedisError) -> AppError {
    AppError::internal(format!("revocation list: {}", e))
}

#[async_trait]
impl RevocationStore for RedisRevocations {
    async fn revoke(&self, jti: &str, ttl: Duration) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let seconds = ttl.as_secs().max(1);

        conn.set_ex::<_, _, ()>(Self::key(jti), 1u8, seconds)
            .await
            .map_err(cache_error)?;

        Ok(())
    }

    async fn is_revoked(&self, jti: &str) -> AppResult<bool> {
        let mut conn = self.connection.clone();
        let exists: bool = conn.exists(Self::key(jti)).await.map_err(cache_error)?;
        Ok(exists)
    }
}
