//! Shared configuration structures.

use serde::{Deserialize, Serialize};

use domain::{
    WorkFactor, DEFAULT_HASH_ITERATIONS, DEFAULT_HASH_MEMORY_KIB, DEFAULT_HASH_PARALLELISM,
    DEFAULT_TOKEN_TTL_SECONDS,
};

/// Database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://sso.db?mode=rwc".to_string(),
            max_connections: 10,
            min_connections: 1,
        }
    }
}

/// Redis configuration for the token revocation list.
///
/// `url: None` keeps revocations in process memory.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CacheConfig {
    pub url: Option<String>,
}

/// Access token configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConfig {
    /// Token lifetime in seconds
    pub ttl_seconds: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
        }
    }
}

/// Password hashing cost configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: DEFAULT_HASH_MEMORY_KIB,
            iterations: DEFAULT_HASH_ITERATIONS,
            parallelism: DEFAULT_HASH_PARALLELISM,
        }
    }
}

impl From<&HashingConfig> for WorkFactor {
    fn from(config: &HashingConfig) -> Self {
        WorkFactor {
            memory_kib: config.memory_kib,
            iterations: config.iterations,
            parallelism: config.parallelism,
        }
    }
}
