//! Command and batch types for atomic multi-command execution.

use std::time::Duration;

/// A single mutating command against the shared store.
///
/// Commands are never executed individually by the cache engine; they are
/// queued into a [`CommandBatch`] so that multi-field mutations become
/// visible to other readers all at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCommand {
    /// Set one or more fields of the hash stored at `key`, creating the hash
    /// if it does not exist. Does not touch the key's TTL.
    HashSet {
        /// Hash key.
        key: String,
        /// Field name/value pairs to set.
        fields: Vec<(String, String)>,
    },

    /// Set or reset the TTL of `key`. A no-op if the key does not exist.
    Expire {
        /// Key whose TTL is set.
        key: String,
        /// Time to live from now.
        ttl: Duration,
    },

    /// Add `member` to the set stored at `key`, creating the set if needed.
    SetAdd {
        /// Set key.
        key: String,
        /// Member to add.
        member: String,
    },
}

/// An ordered list of commands executed atomically by a store backend.
///
/// Either every command in the batch applies, or the execution fails as a
/// whole; partially-applied batches must never become visible to readers.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use recache_store::CommandBatch;
///
/// let batch = CommandBatch::new()
///     .hash_set("record:1", vec![("val".into(), "42".into())])
///     .expire("record:1", Duration::from_secs(60));
/// assert_eq!(batch.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandBatch {
    commands: Vec<StoreCommand>,
}

impl CommandBatch {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a hash field write.
    #[must_use]
    pub fn hash_set(mut self, key: impl Into<String>, fields: Vec<(String, String)>) -> Self {
        self.commands.push(StoreCommand::HashSet {
            key: key.into(),
            fields,
        });
        self
    }

    /// Queues a TTL reset.
    #[must_use]
    pub fn expire(mut self, key: impl Into<String>, ttl: Duration) -> Self {
        self.commands.push(StoreCommand::Expire {
            key: key.into(),
            ttl,
        });
        self
    }

    /// Queues a set-member addition.
    #[must_use]
    pub fn set_add(mut self, key: impl Into<String>, member: impl Into<String>) -> Self {
        self.commands.push(StoreCommand::SetAdd {
            key: key.into(),
            member: member.into(),
        });
        self
    }

    /// Returns `true` if no commands have been queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Number of queued commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// The queued commands, in execution order.
    #[must_use]
    pub fn commands(&self) -> &[StoreCommand] {
        &self.commands
    }

    /// Consumes the batch, yielding the queued commands.
    #[must_use]
    pub fn into_commands(self) -> Vec<StoreCommand> {
        self.commands
    }
}
