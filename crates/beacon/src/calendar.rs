//! Calendar and clock injection
//!
//! Daily gating and cohort weeks depend on "which day is it", which depends
//! on an offset. The dispatcher carries one [`PixelCalendar`] (UTC unless the
//! embedder says otherwise) and one [`DateGenerator`] so tests can steer time.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Offset, Utc};

/// Injected clock. Defaults to the system clock; tests substitute a fake.
pub type DateGenerator = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// The system clock as a [`DateGenerator`].
pub fn system_clock() -> DateGenerator {
    Arc::new(Utc::now)
}

/// Fixed-offset calendar used for day and week arithmetic.
#[derive(Debug, Clone, Copy)]
pub struct PixelCalendar {
    offset: FixedOffset,
}

impl PixelCalendar {
    /// UTC calendar, the default for daily pixel gating.
    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    /// Calendar anchored to an explicit offset.
    pub fn with_offset(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Whether two instants fall on the same calendar day in this offset.
    pub fn same_day(&self, a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
        a.with_timezone(&self.offset).date_naive() == b.with_timezone(&self.offset).date_naive()
    }

    /// Whole 7-day spans between two instants, counted in calendar days.
    pub fn weeks_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
        let from = from.with_timezone(&self.offset).date_naive();
        let to = to.with_timezone(&self.offset).date_naive();
        (to - from).num_days() / 7
    }
}

impl Default for PixelCalendar {
    fn default() -> Self {
        Self::utc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn same_day_respects_utc_midnight() {
        let calendar = PixelCalendar::utc();
        let late = Utc.with_ymd_and_hms(2024, 2, 24, 23, 30, 0).unwrap();
        let early = Utc.with_ymd_and_hms(2024, 2, 25, 0, 30, 0).unwrap();

        assert!(calendar.same_day(late, late + chrono::Duration::minutes(10)));
        assert!(!calendar.same_day(late, early));
    }

    #[test]
    fn same_day_respects_configured_offset() {
        // In a +03:00 calendar, 23:30Z and 01:30Z next day are both past
        // local midnight and land on the same local date.
        let offset = FixedOffset::east_opt(3 * 3600).unwrap();
        let calendar = PixelCalendar::with_offset(offset);
        let a = Utc.with_ymd_and_hms(2024, 2, 24, 23, 30, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 2, 25, 1, 30, 0).unwrap();

        assert!(calendar.same_day(a, b));
        assert!(!PixelCalendar::utc().same_day(a, b));
    }

    #[test]
    fn weeks_between_counts_whole_weeks() {
        let calendar = PixelCalendar::utc();
        let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();

        assert_eq!(calendar.weeks_between(start, start), 0);
        assert_eq!(
            calendar.weeks_between(start, start + chrono::Duration::days(6)),
            0
        );
        assert_eq!(
            calendar.weeks_between(start, start + chrono::Duration::days(7)),
            1
        );
        assert_eq!(
            calendar.weeks_between(start, Utc.with_ymd_and_hms(2024, 2, 24, 0, 0, 0).unwrap()),
            59
        );
    }
}
