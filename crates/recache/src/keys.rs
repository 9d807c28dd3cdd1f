//! Composite key namespacing.
//!
//! Every deployment scopes its keys with a `unique` discriminator so that
//! independent caches can share one store without colliding:
//!
//! - cache records: `recache:<unique>:<key>`
//! - event bindings: `recache:ev:<unique>:<event>`
//! - refresh locks: `recache:lock:<record key>`

const RECORD_PREFIX: &str = "recache";
const EVENT_PREFIX: &str = "recache:ev";
const LOCK_PREFIX: &str = "recache:lock";

#[derive(Debug, Clone)]
pub(crate) struct KeySpace {
    unique: String,
}

impl KeySpace {
    pub(crate) fn new(unique: impl Into<String>) -> Self {
        Self {
            unique: unique.into(),
        }
    }

    pub(crate) fn record_key(&self, key: &str) -> String {
        format!("{RECORD_PREFIX}:{}:{key}", self.unique)
    }

    pub(crate) fn event_key(&self, event: &str) -> String {
        format!("{EVENT_PREFIX}:{}:{event}", self.unique)
    }

    /// Lock names derive from the already-namespaced record key.
    pub(crate) fn lock_name(record_key: &str) -> String {
        format!("{LOCK_PREFIX}:{record_key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_formats() {
        let keys = KeySpace::new("orders");
        assert_eq!(keys.record_key("user:7"), "recache:orders:user:7");
        assert_eq!(keys.event_key("user-changed"), "recache:ev:orders:user-changed");
        assert_eq!(
            KeySpace::lock_name("recache:orders:user:7"),
            "recache:lock:recache:orders:user:7"
        );
    }

    #[test]
    fn test_distinct_uniques_do_not_collide() {
        let a = KeySpace::new("a");
        let b = KeySpace::new("b");
        assert_ne!(a.record_key("k"), b.record_key("k"));
        assert_ne!(a.event_key("e"), b.event_key("e"));
    }
}
