//! Beacon Timestamp Store
//!
//! Key-value persistence of "last fired" timestamps, keyed by pixel storage
//! key. The embedding application picks an implementation: [`MemoryStore`]
//! for tests and ephemeral use, [`SqliteStore`] for durable history.

pub mod sqlite;

pub use sqlite::SqliteStore;

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

/// Persistence seam for pixel fire timestamps.
///
/// Operations are infallible by contract: implementations handle their own
/// failures by logging and degrading, so a failed read behaves as "never
/// fired" and a failed write is dropped. No persistence error reaches the
/// frequency policy layer.
pub trait TimestampStore: Send + Sync {
    /// The last recorded fire for `key`, if any.
    fn last_fire(&self, key: &str) -> Option<DateTime<Utc>>;

    /// Record `when` as the last fire for `key`, replacing any prior record.
    fn set_last_fire(&self, key: &str, when: DateTime<Utc>);

    /// Delete the record for `key`.
    fn remove(&self, key: &str);

    /// All keys currently recorded.
    fn keys(&self) -> Vec<String>;
}

/// In-memory timestamp store.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimestampStore for MemoryStore {
    fn last_fire(&self, key: &str) -> Option<DateTime<Utc>> {
        self.entries.lock().unwrap().get(key).copied()
    }

    fn set_last_fire(&self, key: &str, when: DateTime<Utc>) {
        self.entries.lock().unwrap().insert(key.to_string(), when);
    }

    fn remove(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.entries.lock().unwrap().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new();
        let when = Utc.with_ymd_and_hms(2024, 2, 24, 12, 0, 0).unwrap();

        assert_eq!(store.last_fire("beacon.pixel.test"), None);

        store.set_last_fire("beacon.pixel.test", when);
        assert_eq!(store.last_fire("beacon.pixel.test"), Some(when));

        let later = when + chrono::Duration::hours(1);
        store.set_last_fire("beacon.pixel.test", later);
        assert_eq!(store.last_fire("beacon.pixel.test"), Some(later));
    }

    #[test]
    fn memory_store_remove_and_keys() {
        let store = MemoryStore::new();
        let when = Utc.with_ymd_and_hms(2024, 2, 24, 12, 0, 0).unwrap();

        store.set_last_fire("a", when);
        store.set_last_fire("b", when);

        let mut keys = store.keys();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);

        store.remove("a");
        assert_eq!(store.last_fire("a"), None);
        assert_eq!(store.keys(), vec!["b".to_string()]);
    }
}
