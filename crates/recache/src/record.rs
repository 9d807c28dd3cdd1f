//! The stored shape of a cache entry and its staleness rules.

use std::collections::HashMap;

use time::OffsetDateTime;

/// Hash field holding the serialized payload.
pub(crate) const FIELD_VAL: &str = "val";
/// Hash field holding the epoch-millisecond timestamp of the last refresh.
pub(crate) const FIELD_REFRESH_AT: &str = "refresh_at";
/// Hash field holding the epoch-millisecond timestamp of the last
/// invalidation signal.
pub(crate) const FIELD_SIGN_REFRESH_AT: &str = "sign_refresh_at";

/// Current wall-clock time in epoch milliseconds.
pub(crate) fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// One cache entry as read from the store.
///
/// A record is **missing** when the store had no hash at all for the key.
/// A record is **stale** when it has no usable payload, or when the last
/// invalidation signal is at or after the last refresh. Timestamps that are
/// absent (or fail to parse) make the signal comparison false, so a record
/// with a value and no signal is fresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRecord {
    missing: bool,
    val: Option<String>,
    refresh_at: Option<i64>,
    sign_refresh_at: Option<i64>,
}

impl CacheRecord {
    /// Builds a record from the raw hash fields returned by the store.
    ///
    /// An empty field map means the record is missing entirely.
    #[must_use]
    pub fn from_fields(fields: HashMap<String, String>) -> Self {
        let missing = fields.is_empty();
        let mut fields = fields;
        Self {
            missing,
            val: fields.remove(FIELD_VAL),
            refresh_at: fields.get(FIELD_REFRESH_AT).and_then(|s| s.parse().ok()),
            sign_refresh_at: fields
                .get(FIELD_SIGN_REFRESH_AT)
                .and_then(|s| s.parse().ok()),
        }
    }

    /// `true` when the store had no record at all for this key.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        self.missing
    }

    /// The serialized payload, if one was ever written.
    #[must_use]
    pub fn val(&self) -> Option<&str> {
        self.val.as_deref()
    }

    /// `true` when an invalidation signal is at or after the last refresh.
    ///
    /// Both timestamps must be present for the comparison to hold; a record
    /// that was never signaled (or never refreshed) is not signal-stale.
    #[must_use]
    pub fn is_signal_stale(&self) -> bool {
        match (self.sign_refresh_at, self.refresh_at) {
            (Some(signaled), Some(refreshed)) => signaled >= refreshed,
            _ => false,
        }
    }

    /// The staleness invariant: no payload, or signaled at/after refresh.
    /// Missing implies stale.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.val.is_none() || self.is_signal_stale()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_fields_is_missing_and_stale() {
        let record = CacheRecord::from_fields(HashMap::new());
        assert!(record.is_missing());
        assert!(record.is_stale());
        assert!(record.val().is_none());
    }

    #[test]
    fn test_value_without_signal_is_fresh() {
        let record = CacheRecord::from_fields(fields(&[
            (FIELD_VAL, "\"v\""),
            (FIELD_REFRESH_AT, "1000"),
        ]));
        assert!(!record.is_missing());
        assert!(!record.is_signal_stale());
        assert!(!record.is_stale());
    }

    #[test]
    fn test_signal_at_refresh_is_stale() {
        let record = CacheRecord::from_fields(fields(&[
            (FIELD_VAL, "\"v\""),
            (FIELD_REFRESH_AT, "1000"),
            (FIELD_SIGN_REFRESH_AT, "1000"),
        ]));
        assert!(record.is_signal_stale());
        assert!(record.is_stale());
    }

    #[test]
    fn test_signal_before_refresh_is_fresh() {
        let record = CacheRecord::from_fields(fields(&[
            (FIELD_VAL, "\"v\""),
            (FIELD_REFRESH_AT, "2000"),
            (FIELD_SIGN_REFRESH_AT, "1000"),
        ]));
        assert!(!record.is_signal_stale());
        assert!(!record.is_stale());
    }

    #[test]
    fn test_signal_without_refresh_is_not_signal_stale() {
        // A signal raised against a record that was never refreshed: the
        // comparison has no refresh side, so only the absent payload makes
        // it stale.
        let record = CacheRecord::from_fields(fields(&[(FIELD_SIGN_REFRESH_AT, "1000")]));
        assert!(!record.is_signal_stale());
        assert!(record.is_stale());
    }

    #[test]
    fn test_unparseable_timestamps_count_as_absent() {
        let record = CacheRecord::from_fields(fields(&[
            (FIELD_VAL, "\"v\""),
            (FIELD_REFRESH_AT, "not-a-number"),
            (FIELD_SIGN_REFRESH_AT, "also-not"),
        ]));
        assert!(!record.is_signal_stale());
        assert!(!record.is_stale());
    }

    #[test]
    fn test_missing_value_with_timestamps_is_stale() {
        let record = CacheRecord::from_fields(fields(&[
            (FIELD_REFRESH_AT, "1000"),
            (FIELD_SIGN_REFRESH_AT, "500"),
        ]));
        assert!(!record.is_missing());
        assert!(record.is_stale());
    }

    #[test]
    fn test_now_millis_advances() {
        let a = now_millis();
        let b = now_millis();
        assert!(b >= a);
        // Sanity: on the epoch-milliseconds scale, not seconds or nanos.
        assert!(a > 1_600_000_000_000);
    }
}
