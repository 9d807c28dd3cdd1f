//! The read-through cache engine.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use recache_store::{CommandBatch, DynLock, DynStore, LockGuard};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::CacheOptions;
use crate::error::{BoxError, CacheError};
use crate::index::EventIndex;
use crate::keys::KeySpace;
use crate::record::{CacheRecord, FIELD_REFRESH_AT, FIELD_SIGN_REFRESH_AT, FIELD_VAL, now_millis};

/// Outcome of a refresh-lock acquisition attempt.
///
/// Acquisition errors are deliberately folded into a non-holding outcome
/// instead of being surfaced: a caller asking for a cached value should not
/// fail because the lock store hiccuped. `Contended` and `Unavailable`
/// behave identically downstream; they are distinguished only for logging.
enum LockOutcome {
    /// We hold the lock and own the refresh.
    Acquired(Box<dyn LockGuard>),
    /// Another holder owns the lock right now.
    Contended,
    /// Acquisition errored; treated as not obtained.
    Unavailable,
}

#[derive(Debug, Default)]
struct EngineCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    refreshes: AtomicU64,
    stampede_waits: AtomicU64,
    fallback_loads: AtomicU64,
}

/// Engine statistics snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Calls served from a fresh stored record without refreshing.
    pub hits: u64,
    /// Calls that found no usable stored value.
    pub misses: u64,
    /// Refreshes executed under the lock.
    pub refreshes: u64,
    /// Calls that waited on a concurrent refresher.
    pub stampede_waits: u64,
    /// Calls that loaded from the source after waiting failed.
    pub fallback_loads: u64,
}

/// Read-through cache over a shared key-value store.
///
/// The engine caches serialized values with a TTL, prevents cache stampedes
/// with a per-key distributed refresh lock, and supports event-driven
/// invalidation: entries register interest in named events, and
/// [`invalidate`](CacheEngine::invalidate) lazily marks every registered
/// entry stale without recomputing anything.
///
/// Engines sharing a store and a `unique` discriminator cooperate across
/// processes; each engine owns a private [`EventIndex`] mirror.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use recache::{CacheEngine, CacheOptions};
/// use recache_memory::MemoryStore;
///
/// let store = Arc::new(MemoryStore::new());
/// let engine = CacheEngine::new(store.clone(), store, CacheOptions::new("orders"));
///
/// let total = engine
///     .get_with_events("user:7:total", || compute_total(7), &["user-7-changed"])
///     .await?;
/// engine.invalidate(&["user-7-changed"]).await?;
/// ```
pub struct CacheEngine {
    store: DynStore,
    lock: DynLock,
    index: EventIndex,
    keys: KeySpace,
    options: CacheOptions,
    counters: EngineCounters,
}

impl CacheEngine {
    /// Creates an engine over the given store and lock backends.
    #[must_use]
    pub fn new(store: DynStore, lock: DynLock, options: CacheOptions) -> Self {
        let keys = KeySpace::new(options.unique.clone());
        let index = EventIndex::new(Arc::clone(&store), options.unique.clone());
        Self {
            store,
            lock,
            index,
            keys,
            options,
            counters: EngineCounters::default(),
        }
    }

    /// Returns the cached value for `key`, computing it via `source` when
    /// the record is missing, valueless, or `force_refresh` is set.
    ///
    /// `source` is invoked at most once per call.
    ///
    /// # Errors
    ///
    /// Propagates store read/write failures and `source` failures. Lock
    /// failures are absorbed (see [`CacheError`]).
    pub async fn get<T, F, Fut, E>(
        &self,
        key: &str,
        source: F,
        force_refresh: bool,
    ) -> Result<T, CacheError>
    where
        T: Serialize + DeserializeOwned + Send,
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, E>> + Send,
        E: Into<BoxError>,
    {
        self.get_generic(key, source, &[], force_refresh).await
    }

    /// Like [`get`](CacheEngine::get), but first binds `key` to each event
    /// in `events`, so a later [`invalidate`](CacheEngine::invalidate) of
    /// any of them marks this entry stale. Never forces a refresh by itself.
    ///
    /// # Errors
    ///
    /// As for [`get`](CacheEngine::get); registration failures surface as
    /// store errors.
    pub async fn get_with_events<T, F, Fut, E>(
        &self,
        key: &str,
        source: F,
        events: &[&str],
    ) -> Result<T, CacheError>
    where
        T: Serialize + DeserializeOwned + Send,
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, E>> + Send,
        E: Into<BoxError>,
    {
        self.get_generic(key, source, events, false).await
    }

    /// Marks every cache entry bound to any of `events` as stale.
    ///
    /// Each resolved entry gets its invalidation signal bumped to now and
    /// its TTL reset, all in one atomic batch. Nothing is recomputed or
    /// deleted here; entries refresh lazily on their next read. A no-op if
    /// no entries are bound.
    ///
    /// # Errors
    ///
    /// Propagates store failures from the membership read or the batch.
    pub async fn invalidate(&self, events: &[&str]) -> Result<(), CacheError> {
        let keys = self.index.resolve(events).await?;
        if keys.is_empty() {
            return Ok(());
        }

        let signaled_at = now_millis().to_string();
        let mut batch = CommandBatch::new();
        for key in &keys {
            batch = batch
                .hash_set(
                    key.clone(),
                    vec![(FIELD_SIGN_REFRESH_AT.to_string(), signaled_at.clone())],
                )
                .expire(key.clone(), self.options.ttl());
        }

        tracing::debug!(?events, entries = keys.len(), "raising staleness signal");
        self.store.execute(batch).await?;
        Ok(())
    }

    /// Access to the engine's event index (e.g. for stats).
    #[must_use]
    pub fn event_index(&self) -> &EventIndex {
        &self.index
    }

    /// Snapshot of the engine counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            refreshes: self.counters.refreshes.load(Ordering::Relaxed),
            stampede_waits: self.counters.stampede_waits.load(Ordering::Relaxed),
            fallback_loads: self.counters.fallback_loads.load(Ordering::Relaxed),
        }
    }

    async fn get_generic<T, F, Fut, E>(
        &self,
        key: &str,
        source: F,
        events: &[&str],
        force_refresh: bool,
    ) -> Result<T, CacheError>
    where
        T: Serialize + DeserializeOwned + Send,
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, E>> + Send,
        E: Into<BoxError>,
    {
        let record_key = self.keys.record_key(key);

        if !events.is_empty() {
            self.index.register(&record_key, events).await?;
        }

        let record = self.read_record(&record_key).await?;
        let mut value: Option<T> = self.decode(&record, &record_key);

        // A missing or valueless record (or an explicit force) is a
        // must-get-a-value situation; event-triggered staleness on a record
        // we could decode is not, and tolerates serving the stale value.
        let must_load = record.is_missing() || value.is_none() || force_refresh;
        let needs_refresh = must_load || record.is_signal_stale();

        if value.is_none() {
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
        } else if !needs_refresh {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
        }

        if needs_refresh {
            match self.try_acquire(&KeySpace::lock_name(&record_key)).await {
                LockOutcome::Acquired(guard) => {
                    let refreshed = self.load_and_store(&record_key, &source).await;
                    if let Err(error) = guard.release().await {
                        tracing::warn!(key = %record_key, %error, "failed to release refresh lock");
                    }
                    let refreshed = refreshed?;
                    self.counters.refreshes.fetch_add(1, Ordering::Relaxed);
                    value = Some(refreshed);
                }
                LockOutcome::Contended | LockOutcome::Unavailable => {
                    if must_load {
                        self.counters.stampede_waits.fetch_add(1, Ordering::Relaxed);
                        if let Some(observed) = self.wait_for_refresher(&record_key).await? {
                            value = Some(observed);
                        }
                    }
                    // Pure event staleness: keep the stale value and let the
                    // lock holder refresh it.
                }
            }
        }

        match value {
            Some(value) => Ok(value),
            None => {
                // Last resort: nobody refreshed the record for us. Load it
                // ourselves with a plain (non-exclusive) write; a concurrent
                // refresher may race us and the last write wins.
                tracing::debug!(key = %record_key, "loading from source without lock");
                self.counters.fallback_loads.fetch_add(1, Ordering::Relaxed);
                let value = source().await.map_err(CacheError::source_failed)?;
                self.write_record(&record_key, &value).await?;
                Ok(value)
            }
        }
    }

    async fn read_record(&self, record_key: &str) -> Result<CacheRecord, CacheError> {
        let fields = self.store.hash_get_all(record_key).await?;
        Ok(CacheRecord::from_fields(fields))
    }

    /// Decodes the record's payload; a malformed payload counts as no value
    /// at all, which routes the caller into the refresh path.
    fn decode<T: DeserializeOwned>(&self, record: &CacheRecord, record_key: &str) -> Option<T> {
        let raw = record.val()?;
        match serde_json::from_str(raw) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::warn!(key = %record_key, %error, "discarding undecodable cached value");
                None
            }
        }
    }

    async fn try_acquire(&self, lock_name: &str) -> LockOutcome {
        match self.lock.acquire(lock_name, self.options.lock_ttl()).await {
            Ok(Some(guard)) => LockOutcome::Acquired(guard),
            Ok(None) => {
                tracing::debug!(lock = %lock_name, "refresh lock contended");
                LockOutcome::Contended
            }
            Err(error) => {
                tracing::warn!(lock = %lock_name, %error, "lock acquisition failed; treating as not obtained");
                LockOutcome::Unavailable
            }
        }
    }

    /// The lock-owning refresh: run the source and persist its result.
    async fn load_and_store<T, F, Fut, E>(
        &self,
        record_key: &str,
        source: &F,
    ) -> Result<T, CacheError>
    where
        T: Serialize + Send,
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, E>> + Send,
        E: Into<BoxError>,
    {
        let value = source().await.map_err(CacheError::source_failed)?;
        self.write_record(record_key, &value).await?;
        Ok(value)
    }

    /// Bounded wait for a concurrent lock holder to publish a fresh record.
    ///
    /// Returns `Ok(None)` when the attempts are exhausted without observing
    /// a fresh, decodable value.
    async fn wait_for_refresher<T: DeserializeOwned>(
        &self,
        record_key: &str,
    ) -> Result<Option<T>, CacheError> {
        for attempt in 0..self.options.poll_attempts {
            tokio::time::sleep(self.options.poll_interval()).await;

            let record = self.read_record(record_key).await?;
            if !record.is_stale() {
                if let Some(value) = self.decode(&record, record_key) {
                    tracing::debug!(key = %record_key, attempt, "observed concurrent refresh");
                    return Ok(Some(value));
                }
            }
        }
        tracing::debug!(key = %record_key, "gave up waiting for concurrent refresh");
        Ok(None)
    }

    async fn write_record<T: Serialize>(
        &self,
        record_key: &str,
        value: &T,
    ) -> Result<(), CacheError> {
        let encoded = serde_json::to_string(value).map_err(|source| CacheError::Encode {
            key: record_key.to_string(),
            source,
        })?;

        let batch = CommandBatch::new()
            .hash_set(
                record_key,
                vec![
                    (FIELD_VAL.to_string(), encoded),
                    (FIELD_REFRESH_AT.to_string(), now_millis().to_string()),
                ],
            )
            .expire(record_key, self.options.ttl());
        self.store.execute(batch).await?;
        Ok(())
    }
}
