//! Cohort bucketing
//!
//! Enrollment dates are reported as coarse `week-N` labels counted from a
//! fixed epoch, collapsing to the empty label once the cohort is more than
//! six weeks old.

use chrono::{DateTime, Utc};

use crate::calendar::PixelCalendar;

/// 2023-01-01T00:00:00Z, the first day of cohort week 1.
const COHORT_EPOCH_UNIX: i64 = 1_672_531_200;

/// Cohorts older than this many weeks collapse to the empty label.
const WEEKS_TO_COALESCE: i64 = 6;

fn cohort_epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(COHORT_EPOCH_UNIX, 0).unwrap_or_else(Utc::now)
}

/// Cohort label for an enrollment date, or `""` when there is no enrollment
/// or the cohort has aged out.
pub fn cohort(
    enrollment: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    calendar: PixelCalendar,
) -> String {
    let enrolled = match enrollment {
        Some(enrolled) => enrolled,
        None => return String::new(),
    };

    if calendar.weeks_between(enrolled, now) > WEEKS_TO_COALESCE {
        return String::new();
    }

    let assigned = calendar.weeks_between(cohort_epoch(), enrolled);
    format!("week-{}", assigned + 1)
}
