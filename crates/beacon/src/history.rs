//! Fire history
//!
//! Wraps a [`TimestampStore`] with the storage-key layout and the gate
//! windows the frequency policies ask about. Reads fall back to the legacy
//! key prefix so history written by older builds keeps gating pixels after
//! an upgrade; dry-run state lives under suffixed keys of its own.

use std::sync::Arc;

use beacon_core::wire::storage;
use beacon_store::TimestampStore;
use chrono::{DateTime, Duration, Utc};

use crate::calendar::PixelCalendar;

/// Width of the daily gate window while in dry run.
const DRY_RUN_WINDOW_MINUTES: i64 = 2;

pub struct FireHistory {
    store: Arc<dyn TimestampStore>,
    calendar: PixelCalendar,
    dry_run: bool,
}

impl FireHistory {
    pub fn new(store: Arc<dyn TimestampStore>, calendar: PixelCalendar, dry_run: bool) -> Self {
        Self {
            store,
            calendar,
            dry_run,
        }
    }

    fn storage_key(&self, pixel_key: &str) -> String {
        let mut key = format!("{}{}", storage::KEY_PREFIX, pixel_key);
        if self.dry_run {
            key.push_str(storage::DRY_RUN_KEY_SUFFIX);
        }
        key
    }

    fn legacy_storage_key(&self, pixel_key: &str) -> String {
        let mut key = format!("{}{}", storage::LEGACY_KEY_PREFIX, pixel_key);
        if self.dry_run {
            key.push_str(storage::DRY_RUN_KEY_SUFFIX);
        }
        key
    }

    /// Last recorded fire, preferring the current key layout.
    pub fn last_fire(&self, pixel_key: &str) -> Option<DateTime<Utc>> {
        self.store
            .last_fire(&self.storage_key(pixel_key))
            .or_else(|| self.store.last_fire(&self.legacy_storage_key(pixel_key)))
    }

    /// Record `when` as the last fire, always under the current key layout.
    pub fn record_fire(&self, pixel_key: &str, when: DateTime<Utc>) {
        self.store.set_last_fire(&self.storage_key(pixel_key), when);
    }

    pub fn fired_ever(&self, pixel_key: &str) -> bool {
        self.last_fire(pixel_key).is_some()
    }

    /// Whether the pixel already fired in the current gate window: the same
    /// calendar day, or the last two minutes while in dry run.
    pub fn fired_today(&self, pixel_key: &str, now: DateTime<Utc>) -> bool {
        let last = match self.last_fire(pixel_key) {
            Some(last) => last,
            None => return false,
        };

        if self.dry_run {
            now - last <= Duration::minutes(DRY_RUN_WINDOW_MINUTES)
        } else {
            self.calendar.same_day(last, now)
        }
    }

    /// Forget one pixel's history, in both key layouts.
    pub fn clear(&self, pixel_key: &str) {
        self.store.remove(&self.storage_key(pixel_key));
        self.store.remove(&self.legacy_storage_key(pixel_key));
    }

    /// Forget all pixel history recorded under either key prefix.
    pub fn clear_all(&self) {
        for key in self.store.keys() {
            if key.starts_with(storage::KEY_PREFIX) || key.starts_with(storage::LEGACY_KEY_PREFIX)
            {
                log::debug!("Removing from storage: {}", key);
                self.store.remove(&key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_store::MemoryStore;
    use chrono::TimeZone;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 24, 12, 0, 0).unwrap()
    }

    fn history(store: Arc<dyn TimestampStore>, dry_run: bool) -> FireHistory {
        FireHistory::new(store, PixelCalendar::utc(), dry_run)
    }

    #[test]
    fn records_under_the_current_key_layout() {
        let store = Arc::new(MemoryStore::new());
        let history = history(store.clone(), false);

        history.record_fire("app_launch", noon());
        assert_eq!(store.last_fire("beacon.pixel.app_launch"), Some(noon()));
        assert_eq!(history.last_fire("app_launch"), Some(noon()));
    }

    #[test]
    fn reads_fall_back_to_the_legacy_prefix() {
        let store = Arc::new(MemoryStore::new());
        store.set_last_fire("beacon.telemetry.pixel.old_pixel", noon());

        let history = history(store, false);
        assert_eq!(history.last_fire("old_pixel"), Some(noon()));
        assert!(history.fired_ever("old_pixel"));
    }

    #[test]
    fn dry_run_state_is_isolated() {
        let store = Arc::new(MemoryStore::new());
        let rehearsal = history(store.clone(), true);
        let real = history(store.clone(), false);

        rehearsal.record_fire("app_launch", noon());
        assert_eq!(
            store.last_fire("beacon.pixel.app_launch.dry-run"),
            Some(noon())
        );
        assert!(!real.fired_ever("app_launch"));
    }

    #[test]
    fn fired_today_tracks_the_calendar_day() {
        let store = Arc::new(MemoryStore::new());
        let history = history(store, false);
        let late = Utc.with_ymd_and_hms(2024, 2, 24, 23, 30, 0).unwrap();

        assert!(!history.fired_today("pixel", late));

        history.record_fire("pixel", late);
        assert!(history.fired_today("pixel", late + Duration::minutes(15)));
        assert!(!history.fired_today("pixel", late + Duration::hours(1)));
    }

    #[test]
    fn dry_run_compresses_the_gate_window() {
        let store = Arc::new(MemoryStore::new());
        let history = history(store, true);

        history.record_fire("pixel", noon());
        assert!(history.fired_today("pixel", noon() + Duration::minutes(1)));
        assert!(!history.fired_today("pixel", noon() + Duration::minutes(3)));
    }

    #[test]
    fn clear_removes_both_key_layouts() {
        let store = Arc::new(MemoryStore::new());
        store.set_last_fire("beacon.pixel.p", noon());
        store.set_last_fire("beacon.telemetry.pixel.p", noon());

        let history = history(store.clone(), false);
        history.clear("p");

        assert_eq!(history.last_fire("p"), None);
        assert!(store.keys().is_empty());
    }

    #[test]
    fn clear_all_spares_foreign_keys() {
        let store = Arc::new(MemoryStore::new());
        store.set_last_fire("beacon.pixel.a", noon());
        store.set_last_fire("beacon.telemetry.pixel.b", noon());
        store.set_last_fire("some.other.subsystem", noon());

        history(store.clone(), false).clear_all();

        assert_eq!(store.keys(), vec!["some.other.subsystem".to_string()]);
    }
}
