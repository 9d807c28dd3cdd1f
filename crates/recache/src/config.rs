//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a [`CacheEngine`](crate::CacheEngine).
///
/// All fields except `unique` have serde defaults, so a minimal config is
/// `{"unique": "orders"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheOptions {
    /// Deployment discriminator mixed into every composite key. Engines that
    /// share a `unique` (and a store) share cache records and event
    /// bindings; engines with different values are fully isolated.
    #[serde(default = "default_unique")]
    pub unique: String,

    /// TTL applied to a cache record on every successful write, in seconds.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// TTL of the per-key refresh lock, in seconds.
    #[serde(default = "default_lock_ttl_secs")]
    pub lock_ttl_secs: u64,

    /// Maximum number of re-reads while waiting for a concurrent refresher.
    #[serde(default = "default_poll_attempts")]
    pub poll_attempts: u32,

    /// Pause between those re-reads, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_unique() -> String {
    "default".to_string()
}

fn default_ttl_secs() -> u64 {
    86400
}

fn default_lock_ttl_secs() -> u64 {
    10
}

fn default_poll_attempts() -> u32 {
    10
}

fn default_poll_interval_ms() -> u64 {
    100
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            unique: default_unique(),
            ttl_secs: default_ttl_secs(),
            lock_ttl_secs: default_lock_ttl_secs(),
            poll_attempts: default_poll_attempts(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl CacheOptions {
    /// Options for the given deployment discriminator, everything else
    /// defaulted.
    #[must_use]
    pub fn new(unique: impl Into<String>) -> Self {
        Self {
            unique: unique.into(),
            ..Self::default()
        }
    }

    pub(crate) fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub(crate) fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }

    pub(crate) fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
