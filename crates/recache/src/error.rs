//! Error types for the cache engine.

use recache_store::StoreError;

/// Boxed error type accepted from caller-supplied data sources.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by [`CacheEngine`](crate::CacheEngine) operations.
///
/// Lock acquisition and release failures never appear here; the engine
/// degrades them to "lock not obtained" (availability over strict
/// exclusion). Decode failures on stored payloads are treated as a missing
/// value and routed into the refresh path, so they never surface either.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The shared store failed during a read or write.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A freshly computed value could not be serialized for storage.
    #[error("Failed to encode value for key '{key}'")]
    Encode {
        /// The composite record key being written.
        key: String,
        /// The underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// The caller-supplied data source failed.
    #[error("Data source failed")]
    Source(#[source] BoxError),
}

impl CacheError {
    /// Wraps a data source error.
    #[must_use]
    pub fn source_failed(error: impl Into<BoxError>) -> Self {
        Self::Source(error.into())
    }

    /// Returns `true` if this error originated in the shared store.
    #[must_use]
    pub fn is_store(&self) -> bool {
        matches!(self, Self::Store(_))
    }

    /// Returns `true` if this error originated in the data source.
    #[must_use]
    pub fn is_source(&self) -> bool {
        matches!(self, Self::Source(_))
    }
}
