//! # recache-store
//!
//! Store abstraction layer for the recache engine.
//!
//! This crate defines the traits and types that all store backends must
//! implement. It does not contain any implementations - those are provided
//! by separate crates (`recache-memory`, `recache-redis`).
//!
//! ## Overview
//!
//! The main traits are:
//! - [`KeyValueStore`]: atomic hash reads, set membership reads, and atomic
//!   multi-command batches ([`CommandBatch`])
//! - [`DistributedLock`]: acquire-with-TTL / release mutual exclusion across
//!   processes sharing the same store
//!
//! ## Store Backends
//!
//! To implement a backend, implement both traits:
//!
//! ```ignore
//! use async_trait::async_trait;
//! use recache_store::{CommandBatch, KeyValueStore, StoreError};
//!
//! struct MyStore {
//!     // ...
//! }
//!
//! #[async_trait]
//! impl KeyValueStore for MyStore {
//!     async fn execute(&self, batch: CommandBatch) -> Result<(), StoreError> {
//!         // Apply every command atomically
//!     }
//!     // ... other methods
//! }
//! ```

mod error;
mod traits;
mod types;

pub use error::{ErrorCategory, StoreError};
pub use traits::{DistributedLock, KeyValueStore, LockGuard};
pub use types::{CommandBatch, StoreCommand};

/// Type alias for a store result.
pub type StoreResult<T> = Result<T, StoreError>;

/// Type alias for a shared store trait object.
pub type DynStore = std::sync::Arc<dyn KeyValueStore>;

/// Type alias for a shared lock trait object.
pub type DynLock = std::sync::Arc<dyn DistributedLock>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use recache_store::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ErrorCategory, StoreError};
    pub use crate::traits::{DistributedLock, KeyValueStore, LockGuard};
    pub use crate::types::{CommandBatch, StoreCommand};
    pub use crate::{DynLock, DynStore, StoreResult};
}
