//! # recache
//!
//! Event-invalidated, stampede-resistant read-through cache over a shared
//! key-value store.
//!
//! ## Overview
//!
//! [`CacheEngine`] layers three behaviors over any store implementing the
//! [`recache_store`] traits:
//!
//! - **Read-through with TTL**: [`CacheEngine::get`] returns the cached
//!   value for a key, invoking a caller-supplied async `source` only when
//!   the record is missing, valueless, or explicitly force-refreshed.
//! - **Stampede protection**: a per-key distributed refresh lock makes one
//!   caller recompute while concurrent callers wait (bounded polling) for
//!   the refreshed record instead of piling onto the source.
//! - **Event-driven invalidation**: [`CacheEngine::get_with_events`] binds
//!   an entry to named events via the [`EventIndex`];
//!   [`CacheEngine::invalidate`] lazily marks every bound entry stale
//!   without deleting or recomputing anything.
//!
//! Exclusion is weak by design: the refresh lock is time-bounded, so a
//! stalled holder can be raced. Staleness windows are accepted in exchange
//! for availability.
//!
//! ## Backends
//!
//! Store and lock backends are injected as trait objects; see
//! `recache-redis` for the Redis implementation and `recache-memory` for an
//! in-process one.

mod config;
mod engine;
mod error;
mod index;
mod keys;
mod record;

pub use config::CacheOptions;
pub use engine::{CacheEngine, CacheStats};
pub use error::{BoxError, CacheError};
pub use index::{EventIndex, IndexStats};
pub use record::CacheRecord;

// Re-exported so callers can name the backend traits without a direct
// dependency on the store crate.
pub use recache_store::{DynLock, DynStore};
