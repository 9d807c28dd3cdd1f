//! `DistributedLock` implementation over Redis.
//!
//! Acquisition is a single `SET name token NX PX ttl` and release is a
//! compare-and-delete script, so a guard whose TTL has lapsed cannot free a
//! lock that another process has since taken over.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::Pool;
use recache_store::{DistributedLock, LockGuard, StoreError};
use uuid::Uuid;

const RELEASE_SCRIPT: &str = r#"
if redis.call("get", KEYS[1]) == ARGV[1] then
    return redis.call("del", KEYS[1])
else
    return 0
end
"#;

/// Redis-backed distributed lock.
#[derive(Clone)]
pub struct RedisLock {
    pool: Pool,
}

impl RedisLock {
    /// Creates a lock backend over an existing pool.
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DistributedLock for RedisLock {
    async fn acquire(
        &self,
        name: &str,
        ttl: Duration,
    ) -> Result<Option<Box<dyn LockGuard>>, StoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| StoreError::connection(format!("failed to get Redis connection: {e}")))?;

        let token = Uuid::new_v4();
        let reply: Option<String> = redis::cmd("SET")
            .arg(name)
            .arg(token.to_string())
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::command(format!("SET NX {name}: {e}")))?;

        Ok(reply.map(|_| {
            Box::new(RedisLockGuard {
                pool: self.pool.clone(),
                name: name.to_string(),
                token,
            }) as Box<dyn LockGuard>
        }))
    }
}

struct RedisLockGuard {
    pool: Pool,
    name: String,
    token: Uuid,
}

#[async_trait]
impl LockGuard for RedisLockGuard {
    async fn release(self: Box<Self>) -> Result<(), StoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| StoreError::connection(format!("failed to get Redis connection: {e}")))?;

        let released: i64 = redis::Script::new(RELEASE_SCRIPT)
            .key(&self.name)
            .arg(self.token.to_string())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| StoreError::command(format!("lock release {}: {e}", self.name)))?;

        if released == 0 {
            tracing::debug!(lock = %self.name, "lock already expired or taken over at release");
        }
        Ok(())
    }
}
