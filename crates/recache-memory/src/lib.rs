//! # recache-memory
//!
//! In-memory store backend for the recache engine.
//!
//! [`MemoryStore`] implements both [`recache_store::KeyValueStore`] and
//! [`recache_store::DistributedLock`] against process-local state. It mirrors
//! the shared-store contract closely enough to stand in for a real backend in
//! tests and single-process embeddings: batches apply atomically, TTLs expire
//! entries (lazily, on access), and lock ownership is time-bounded and fenced
//! by a per-acquisition token.
//!
//! "Distributed" is of course nominal here: exclusion only spans tasks of the
//! current process.

mod store;

pub use store::MemoryStore;
