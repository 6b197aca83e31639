//! Auth service configuration.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use common::{CacheConfig, DatabaseConfig, HashingConfig, TokenConfig};

/// Default gRPC port
pub const DEFAULT_PORT: u16 = 44044;

/// Default per-request deadline in milliseconds
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;

/// Auth service configuration.
#[derive(Debug, Clone)]
pub struct AuthServiceConfig {
    /// Users/apps storage
    pub database: DatabaseConfig,
    /// Redis for the revocation list (in-process when unset)
    pub cache: CacheConfig,
    /// Access token lifetime
    pub token: TokenConfig,
    /// Password hashing work factor
    pub hashing: HashingConfig,
    /// Deadline applied to every request, and cap on client deadlines
    pub request_timeout: Duration,
}

fn parsed<T: FromStr>(names: &[&str]) -> Option<T> {
    names
        .iter()
        .find_map(|name| env::var(name).ok())
        .and_then(|value| value.parse().ok())
}

impl AuthServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            database: DatabaseConfig {
                url: env::var("AUTH_SERVICE_DATABASE_URL")
                    .or_else(|_| env::var("DATABASE_URL"))
                    .unwrap_or(defaults.database.url),
                max_connections: parsed(&["DATABASE_MAX_CONNECTIONS"])
                    .unwrap_or(defaults.database.max_connections),
                min_connections: parsed(&["DATABASE_MIN_CONNECTIONS"])
                    .unwrap_or(defaults.database.min_connections),
            },
            cache: CacheConfig {
                url: env::var("AUTH_SERVICE_REDIS_URL")
                    .or_else(|_| env::var("REDIS_URL"))
                    .ok(),
            },
            token: TokenConfig {
                ttl_seconds: parsed(&["AUTH_SERVICE_TOKEN_TTL_SECONDS", "TOKEN_TTL_SECONDS"])
                    .unwrap_or(defaults.token.ttl_seconds),
            },
            hashing: HashingConfig {
                memory_kib: parsed(&["HASH_MEMORY_KIB"]).unwrap_or(defaults.hashing.memory_kib),
                iterations: parsed(&["HASH_ITERATIONS"]).unwrap_or(defaults.hashing.iterations),
                parallelism: parsed(&["HASH_PARALLELISM"])
                    .unwrap_or(defaults.hashing.parallelism),
            },
            request_timeout: parsed(&["REQUEST_TIMEOUT_MS"])
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_timeout),
        }
    }
}

impl Default for AuthServiceConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            cache: CacheConfig::default(),
            token: TokenConfig::default(),
            hashing: HashingConfig::default(),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AuthServiceConfig::default();
        assert_eq!(config.token.ttl_seconds, 3600);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert!(config.cache.url.is_none());
    }

    #[test]
    fn test_parsed_skips_missing_names() {
        let value: Option<u32> = parsed(&["SSO_TEST_SURELY_UNSET_VARIABLE"]);
        assert!(value.is_none());
    }
}
