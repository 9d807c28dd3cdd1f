//! `KeyValueStore` implementation over a deadpool Redis pool.

use std::collections::HashMap;

use async_trait::async_trait;
use deadpool_redis::Pool;
use recache_store::{CommandBatch, KeyValueStore, StoreCommand, StoreError};
use redis::AsyncCommands;

/// Redis-backed key-value store.
///
/// Hashes map to Redis hashes, sets to Redis sets, and [`CommandBatch`]
/// execution to an atomic `MULTI`/`EXEC` pipeline, so a batch becomes
/// visible to other clients as a whole or not at all.
#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    /// Creates a store over an existing pool.
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection, StoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::connection(format!("failed to get Redis connection: {e}")))
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        let mut conn = self.connection().await?;
        let fields: HashMap<String, String> = conn
            .hgetall(key)
            .await
            .map_err(|e| StoreError::command(format!("HGETALL {key}: {e}")))?;
        Ok(fields)
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.connection().await?;
        let members: Vec<String> = conn
            .smembers(key)
            .await
            .map_err(|e| StoreError::command(format!("SMEMBERS {key}: {e}")))?;
        Ok(members)
    }

    async fn execute(&self, batch: CommandBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for command in batch.into_commands() {
            match command {
                StoreCommand::HashSet { key, fields } => {
                    pipe.hset_multiple(&key, &fields).ignore();
                }
                StoreCommand::Expire { key, ttl } => {
                    // PEXPIRE keeps sub-second TTLs exact.
                    pipe.pexpire(&key, ttl.as_millis() as i64).ignore();
                }
                StoreCommand::SetAdd { key, member } => {
                    pipe.sadd(&key, &member).ignore();
                }
            }
        }

        let mut conn = self.connection().await?;
        let _: () = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::command(format!("MULTI/EXEC batch: {e}")))?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
