//! Store traits for the recache storage abstraction layer.
//!
//! This module defines the contracts that all store backends must implement.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::CommandBatch;

/// A shared key-value store exposing the primitives the cache engine needs:
/// atomic hash read, set membership read, and atomic multi-command batches.
///
/// Implementations must be thread-safe (`Send + Sync`) and safe to share
/// across arbitrarily many engine instances and processes; correctness of
/// the engine depends on every batch applying atomically with respect to
/// concurrent readers.
///
/// # Example
///
/// ```ignore
/// use recache_store::{DynStore, StoreError};
///
/// async fn record_exists(store: &DynStore, key: &str) -> Result<bool, StoreError> {
///     let fields = store.hash_get_all(key).await?;
///     Ok(!fields.is_empty())
/// }
/// ```
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads every field of the hash stored at `key`.
    ///
    /// An empty map means the key does not exist; backends must not
    /// distinguish "absent key" from "hash with no fields".
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues, not for missing keys.
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError>;

    /// Reads every member of the set stored at `key`.
    ///
    /// An empty vec means the set does not exist or has no members. No
    /// ordering is guaranteed.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues.
    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError>;

    /// Executes every command in `batch` atomically.
    ///
    /// Either all commands apply or the call errors; a partially-applied
    /// batch must never become visible to other readers. Executing an empty
    /// batch is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch could not be executed as a whole.
    async fn execute(&self, batch: CommandBatch) -> Result<(), StoreError>;

    /// Returns the name of this store backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}

/// A cross-process mutual-exclusion primitive with time-bounded ownership.
///
/// The lock is best-effort by design: ownership expires after `ttl` even if
/// the holder never releases, so a stalled holder can be raced by a second
/// acquirer. Callers that need strict exclusion must not build on this.
#[async_trait]
pub trait DistributedLock: Send + Sync {
    /// Attempts to acquire the named lock for at most `ttl`.
    ///
    /// Returns `Ok(Some(guard))` when acquired, `Ok(None)` when the lock is
    /// currently held elsewhere. There is no waiting or retrying; contention
    /// is reported immediately.
    ///
    /// # Errors
    ///
    /// Returns an error when the store backing the lock is unreachable.
    async fn acquire(
        &self,
        name: &str,
        ttl: Duration,
    ) -> Result<Option<Box<dyn LockGuard>>, StoreError>;
}

/// Ownership of an acquired lock.
///
/// Dropping a guard without calling [`release`](LockGuard::release) leaves
/// the lock to expire on its own TTL.
#[async_trait]
pub trait LockGuard: Send + Sync {
    /// Releases the lock.
    ///
    /// Implementations must only release if this guard still owns the lock
    /// (the TTL may have expired and another holder taken over).
    ///
    /// # Errors
    ///
    /// Returns an error when the store backing the lock is unreachable.
    async fn release(self: Box<Self>) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time test that KeyValueStore is object-safe
    fn _assert_store_object_safe(_: &dyn KeyValueStore) {}

    // Compile-time test that DistributedLock is object-safe
    fn _assert_lock_object_safe(_: &dyn DistributedLock) {}

    // Compile-time test that LockGuard is object-safe
    fn _assert_guard_object_safe(_: &dyn LockGuard) {}
}
