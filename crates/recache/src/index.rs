//! Event-to-key index with an in-process mirror.
//!
//! Event bindings live in store-backed sets (one per event) shared by every
//! process; the mirror is a private read-through cache over them. Once an
//! event's membership has been hydrated from the store, later resolves are
//! served from memory for the rest of this index's lifetime - new members
//! registered by *other* processes will not be seen. That window is
//! acceptable: bindings are monotonic and invalidation is already lazy.

use std::collections::HashSet;

use dashmap::DashMap;
use recache_store::{CommandBatch, DynStore, StoreResult};

use crate::keys::KeySpace;

#[derive(Debug, Default)]
struct MirrorEntry {
    members: HashSet<String>,
    /// Set once the event's membership has been loaded from the store.
    hydrated: bool,
}

/// Maps event names to the composite cache keys bound to them.
///
/// One instance per engine; the mirror is never shared between instances
/// and dies with the engine.
pub struct EventIndex {
    store: DynStore,
    keys: KeySpace,
    mirror: DashMap<String, MirrorEntry>,
}

impl EventIndex {
    /// Creates an index over `store`, namespaced by `unique`.
    #[must_use]
    pub fn new(store: DynStore, unique: impl Into<String>) -> Self {
        Self {
            store,
            keys: KeySpace::new(unique),
            mirror: DashMap::new(),
        }
    }

    /// Binds `composite_key` to each event in `events`.
    ///
    /// Idempotent per process: a (key, event) pair the mirror already knows
    /// issues no store write, so repeated registration costs one store
    /// round-trip over the index's lifetime. All new bindings from one call
    /// go to the store as a single atomic batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the batch. The mirror keeps the
    /// optimistically recorded members in that case; bindings are monotonic,
    /// so a later retry converges.
    pub async fn register(&self, composite_key: &str, events: &[&str]) -> StoreResult<()> {
        let mut batch = CommandBatch::new();
        for event in events {
            let mut entry = self.mirror.entry((*event).to_string()).or_default();
            if entry.members.insert(composite_key.to_string()) {
                batch = batch.set_add(self.keys.event_key(event), composite_key);
            }
        }

        if !batch.is_empty() {
            tracing::debug!(key = %composite_key, bindings = batch.len(), "registering event bindings");
            self.store.execute(batch).await?;
        }
        Ok(())
    }

    /// Returns every composite key bound to any of `events`, concatenated in
    /// event order.
    ///
    /// A key bound to two requested events appears twice; callers tolerate
    /// or dedupe. The first resolve of an event hydrates the mirror from the
    /// store; later resolves of that event are served from memory.
    ///
    /// # Errors
    ///
    /// Returns an error if a membership read fails.
    pub async fn resolve(&self, events: &[&str]) -> StoreResult<Vec<String>> {
        let mut all_keys = Vec::new();

        for event in events {
            let cached = match self.mirror.get(*event) {
                Some(entry) if entry.hydrated => {
                    Some(entry.members.iter().cloned().collect::<Vec<_>>())
                }
                _ => None,
            };
            if let Some(members) = cached {
                all_keys.extend(members);
                continue;
            }

            let fetched = self.store.set_members(&self.keys.event_key(event)).await?;
            {
                let mut entry = self.mirror.entry((*event).to_string()).or_default();
                entry.members.extend(fetched.iter().cloned());
                entry.hydrated = true;
            }
            all_keys.extend(fetched);
        }

        Ok(all_keys)
    }

    /// Snapshot of the mirror for logging and health surfaces.
    #[must_use]
    pub fn stats(&self) -> IndexStats {
        let mut hydrated_events = 0;
        let mut known_keys = 0;
        for entry in self.mirror.iter() {
            if entry.hydrated {
                hydrated_events += 1;
            }
            known_keys += entry.members.len();
        }
        IndexStats {
            events: self.mirror.len(),
            hydrated_events,
            known_keys,
        }
    }
}

/// Mirror statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    /// Events the mirror has an entry for.
    pub events: usize,
    /// Events whose membership has been loaded from the store.
    pub hydrated_events: usize,
    /// Total member keys known locally (summed across events).
    pub known_keys: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use recache_memory::MemoryStore;

    fn index(store: &MemoryStore) -> EventIndex {
        EventIndex::new(Arc::new(store.clone()), "test")
    }

    #[tokio::test]
    async fn test_register_then_resolve() {
        let store = MemoryStore::new();
        let idx = index(&store);

        idx.register("recache:test:k1", &["changed"]).await.unwrap();
        let keys = idx.resolve(&["changed"]).await.unwrap();
        assert_eq!(keys, vec!["recache:test:k1".to_string()]);
    }

    #[tokio::test]
    async fn test_resolve_unknown_event_is_empty() {
        let store = MemoryStore::new();
        let idx = index(&store);
        assert!(idx.resolve(&["never-fired"]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stats() {
        let store = MemoryStore::new();
        let idx = index(&store);

        idx.register("k1", &["a", "b"]).await.unwrap();
        idx.resolve(&["a"]).await.unwrap();

        let stats = idx.stats();
        assert_eq!(stats.events, 2);
        assert_eq!(stats.hydrated_events, 1);
        assert_eq!(stats.known_keys, 2);
    }
}
