//! Redis connection configuration.

use std::time::Duration;

use deadpool_redis::Pool;
use recache_store::StoreError;
use serde::{Deserialize, Serialize};

/// Redis connection settings for the store and lock backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,

    /// Connection timeout in milliseconds
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_pool_size() -> usize {
    10
}

fn default_redis_timeout_ms() -> u64 {
    5000
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}

/// Builds a deadpool Redis pool from the given configuration.
///
/// The pool is created lazily; no connection is attempted here. Callers that
/// want to fail fast should `pool.get().await` once after creation.
///
/// # Errors
///
/// Returns `StoreError::Connection` if the URL or pool configuration is
/// invalid.
pub fn create_pool(config: &RedisConfig) -> Result<Pool, StoreError> {
    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    let mut pool_config = redis_config.get_pool_config();
    pool_config.max_size = config.pool_size;
    pool_config.timeouts.wait = Some(Duration::from_millis(config.timeout_ms));
    pool_config.timeouts.create = Some(Duration::from_millis(config.timeout_ms));
    pool_config.timeouts.recycle = Some(Duration::from_millis(config.timeout_ms));
    redis_config.pool = Some(pool_config);

    redis_config
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))
        .map_err(|e| StoreError::connection(format!("failed to create Redis pool: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RedisConfig::default();
        assert_eq!(config.url, "redis://localhost:6379");
        assert_eq!(config.pool_size, 10);
        assert_eq!(config.timeout_ms, 5000);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: RedisConfig = serde_json::from_str(r#"{"url": "redis://cache:6380"}"#)
            .expect("deserialize partial config");
        assert_eq!(config.url, "redis://cache:6380");
        assert_eq!(config.pool_size, 10);
    }

    #[test]
    fn test_create_pool_from_defaults() {
        let pool = create_pool(&RedisConfig::default());
        assert!(pool.is_ok());
    }
}
