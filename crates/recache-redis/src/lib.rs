//! # recache-redis
//!
//! Redis store backend for the recache engine.
//!
//! Implements [`recache_store::KeyValueStore`] and
//! [`recache_store::DistributedLock`] over a `deadpool-redis` pool:
//!
//! - [`RedisStore`]: `HGETALL` / `SMEMBERS` reads, atomic `MULTI`/`EXEC`
//!   pipelines for command batches
//! - [`RedisLock`]: `SET NX PX` acquisition with a fenced compare-and-delete
//!   release script
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use recache_redis::{RedisConfig, RedisLock, RedisStore, create_pool};
//!
//! let pool = create_pool(&RedisConfig::default())?;
//! let store = Arc::new(RedisStore::new(pool.clone()));
//! let lock = Arc::new(RedisLock::new(pool));
//! ```

mod config;
mod lock;
mod store;

pub use config::{RedisConfig, create_pool};
pub use lock::RedisLock;
pub use store::RedisStore;
