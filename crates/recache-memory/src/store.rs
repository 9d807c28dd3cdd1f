use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use recache_store::{
    CommandBatch, DistributedLock, KeyValueStore, LockGuard, StoreCommand, StoreError,
};
use uuid::Uuid;

/// A value with an optional expiry deadline.
#[derive(Debug, Clone)]
struct Expiring<T> {
    data: T,
    deadline: Option<Instant>,
}

impl<T> Expiring<T> {
    fn new(data: T) -> Self {
        Self {
            data,
            deadline: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| deadline <= now)
    }
}

#[derive(Debug)]
struct LockEntry {
    token: Uuid,
    deadline: Instant,
}

#[derive(Debug, Default)]
struct Inner {
    hashes: HashMap<String, Expiring<HashMap<String, String>>>,
    sets: HashMap<String, Expiring<HashSet<String>>>,
    locks: HashMap<String, LockEntry>,
}

impl Inner {
    /// Drops the hash at `key` if its deadline has passed.
    fn purge_hash(&mut self, key: &str, now: Instant) {
        if self.hashes.get(key).is_some_and(|e| e.is_expired(now)) {
            self.hashes.remove(key);
        }
    }

    fn purge_set(&mut self, key: &str, now: Instant) {
        if self.sets.get(key).is_some_and(|e| e.is_expired(now)) {
            self.sets.remove(key);
        }
    }

    fn apply(&mut self, command: StoreCommand, now: Instant) {
        match command {
            StoreCommand::HashSet { key, fields } => {
                self.purge_hash(&key, now);
                let entry = self
                    .hashes
                    .entry(key)
                    .or_insert_with(|| Expiring::new(HashMap::new()));
                entry.data.extend(fields);
            }
            StoreCommand::Expire { key, ttl } => {
                // Matches the shared-store contract: expiring a missing key
                // is a no-op, and hashes and sets share one key space.
                let deadline = Some(now + ttl);
                self.purge_hash(&key, now);
                self.purge_set(&key, now);
                if let Some(entry) = self.hashes.get_mut(&key) {
                    entry.deadline = deadline;
                } else if let Some(entry) = self.sets.get_mut(&key) {
                    entry.deadline = deadline;
                }
            }
            StoreCommand::SetAdd { key, member } => {
                self.purge_set(&key, now);
                let entry = self
                    .sets
                    .entry(key)
                    .or_insert_with(|| Expiring::new(HashSet::new()));
                entry.data.insert(member);
            }
        }
    }
}

/// In-memory store implementing both `KeyValueStore` and `DistributedLock`.
///
/// All state lives behind a single mutex, so batch execution is trivially
/// atomic with respect to concurrent readers. Cloning is cheap and clones
/// share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_inner(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned mutex means a panic mid-mutation in this process;
        // surface it rather than serving torn state.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        let now = Instant::now();
        let mut inner = self.lock_inner();
        inner.purge_hash(key, now);
        Ok(inner
            .hashes
            .get(key)
            .map(|entry| entry.data.clone())
            .unwrap_or_default())
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let now = Instant::now();
        let mut inner = self.lock_inner();
        inner.purge_set(key, now);
        Ok(inner
            .sets
            .get(key)
            .map(|entry| entry.data.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn execute(&self, batch: CommandBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        let now = Instant::now();
        let mut inner = self.lock_inner();
        for command in batch.into_commands() {
            inner.apply(command, now);
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl DistributedLock for MemoryStore {
    async fn acquire(
        &self,
        name: &str,
        ttl: Duration,
    ) -> Result<Option<Box<dyn LockGuard>>, StoreError> {
        let now = Instant::now();
        let mut inner = self.lock_inner();

        if let Some(entry) = inner.locks.get(name) {
            if entry.deadline > now {
                return Ok(None);
            }
            inner.locks.remove(name);
        }

        let token = Uuid::new_v4();
        inner.locks.insert(
            name.to_string(),
            LockEntry {
                token,
                deadline: now + ttl,
            },
        );

        Ok(Some(Box::new(MemoryLockGuard {
            inner: Arc::clone(&self.inner),
            name: name.to_string(),
            token,
        })))
    }
}

struct MemoryLockGuard {
    inner: Arc<Mutex<Inner>>,
    name: String,
    token: Uuid,
}

#[async_trait]
impl LockGuard for MemoryLockGuard {
    async fn release(self: Box<Self>) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        // Only release our own acquisition; the TTL may have lapsed and the
        // lock been taken over in the meantime.
        if inner
            .locks
            .get(&self.name)
            .is_some_and(|entry| entry.token == self.token)
        {
            inner.locks.remove(&self.name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_get_all_missing_is_empty() {
        let store = MemoryStore::new();
        let fields = store.hash_get_all("nope").await.unwrap();
        assert!(fields.is_empty());
    }

    #[tokio::test]
    async fn test_hash_set_merges_fields() {
        let store = MemoryStore::new();
        store
            .execute(CommandBatch::new().hash_set("h", vec![("a".into(), "1".into())]))
            .await
            .unwrap();
        store
            .execute(CommandBatch::new().hash_set("h", vec![("b".into(), "2".into())]))
            .await
            .unwrap();

        let fields = store.hash_get_all("h").await.unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields.get("a").map(String::as_str), Some("1"));
        assert_eq!(fields.get("b").map(String::as_str), Some("2"));
    }

    #[tokio::test]
    async fn test_expire_drops_hash_after_deadline() {
        let store = MemoryStore::new();
        store
            .execute(
                CommandBatch::new()
                    .hash_set("h", vec![("a".into(), "1".into())])
                    .expire("h", Duration::from_millis(20)),
            )
            .await
            .unwrap();

        assert!(!store.hash_get_all("h").await.unwrap().is_empty());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(store.hash_get_all("h").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expire_missing_key_is_noop() {
        let store = MemoryStore::new();
        store
            .execute(CommandBatch::new().expire("ghost", Duration::from_millis(10)))
            .await
            .unwrap();
        assert!(store.hash_get_all("ghost").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_add_and_members() {
        let store = MemoryStore::new();
        store
            .execute(
                CommandBatch::new()
                    .set_add("s", "a")
                    .set_add("s", "b")
                    .set_add("s", "a"),
            )
            .await
            .unwrap();

        let mut members = store.set_members("s").await.unwrap();
        members.sort();
        assert_eq!(members, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_batch_applies_all_commands() {
        let store = MemoryStore::new();
        store
            .execute(
                CommandBatch::new()
                    .hash_set("h1", vec![("val".into(), "1".into())])
                    .expire("h1", Duration::from_secs(60))
                    .hash_set("h2", vec![("val".into(), "2".into())])
                    .expire("h2", Duration::from_secs(60)),
            )
            .await
            .unwrap();

        assert_eq!(
            store
                .hash_get_all("h1")
                .await
                .unwrap()
                .get("val")
                .map(String::as_str),
            Some("1")
        );
        assert_eq!(
            store
                .hash_get_all("h2")
                .await
                .unwrap()
                .get("val")
                .map(String::as_str),
            Some("2")
        );
    }

    #[tokio::test]
    async fn test_lock_contention() {
        let store = MemoryStore::new();
        let guard = store
            .acquire("lock:a", Duration::from_secs(10))
            .await
            .unwrap()
            .expect("first acquire succeeds");

        assert!(
            store
                .acquire("lock:a", Duration::from_secs(10))
                .await
                .unwrap()
                .is_none()
        );

        guard.release().await.unwrap();

        assert!(
            store
                .acquire("lock:a", Duration::from_secs(10))
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_lock_expires() {
        let store = MemoryStore::new();
        let _stale = store
            .acquire("lock:b", Duration::from_millis(20))
            .await
            .unwrap()
            .expect("first acquire succeeds");

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(
            store
                .acquire("lock:b", Duration::from_secs(10))
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_stale_release_does_not_steal() {
        let store = MemoryStore::new();
        let stale = store
            .acquire("lock:c", Duration::from_millis(20))
            .await
            .unwrap()
            .expect("first acquire succeeds");

        tokio::time::sleep(Duration::from_millis(40)).await;

        let _current = store
            .acquire("lock:c", Duration::from_secs(10))
            .await
            .unwrap()
            .expect("takeover after expiry succeeds");

        // Releasing the lapsed guard must not free the current holder's lock.
        stale.release().await.unwrap();

        assert!(
            store
                .acquire("lock:c", Duration::from_secs(10))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_independent_lock_names() {
        let store = MemoryStore::new();
        let _a = store
            .acquire("lock:x", Duration::from_secs(10))
            .await
            .unwrap()
            .expect("acquire x");
        assert!(
            store
                .acquire("lock:y", Duration::from_secs(10))
                .await
                .unwrap()
                .is_some()
        );
    }
}
