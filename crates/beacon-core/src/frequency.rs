//! Pixel frequency policies
//!
//! A [`Frequency`] controls how often a named pixel may be transmitted. The
//! legacy variants reproduce the wire behavior of older call sites and are
//! kept for compatibility; new call sites should use the non-legacy forms.

use serde::{Deserialize, Serialize};

/// How often a pixel is allowed to fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    /// Sent every time `fire` is called.
    Standard,

    /// Legacy. Sent once ever, with no name suffix.
    LegacyInitial,

    /// Sent once ever. The pixel name must end with `_u`.
    UniqueByName,

    /// Sent once ever per distinct parameter set for the same name.
    UniqueByNameAndParameters,

    /// Legacy. Sent at most once per calendar day, with no name suffix.
    LegacyDaily,

    /// Sent at most once per calendar day, with a `_d` suffix on the wire.
    Daily,

    /// Legacy. A `_d` pixel at most once per day plus a `_c` pixel on every
    /// call.
    LegacyDailyAndCount,

    /// A `_daily` pixel at most once per day plus a `_count` pixel on every
    /// call.
    DailyAndCount,

    /// A `_daily` pixel at most once per day plus the plain pixel on every
    /// call.
    DailyAndStandard,
}

impl Frequency {
    /// Short name used in log lines.
    pub fn label(&self) -> &'static str {
        match self {
            Frequency::Standard => "standard",
            Frequency::LegacyInitial => "legacy-initial",
            Frequency::UniqueByName => "unique-by-name",
            Frequency::UniqueByNameAndParameters => "unique-by-name-and-parameters",
            Frequency::LegacyDaily => "legacy-daily",
            Frequency::Daily => "daily",
            Frequency::LegacyDailyAndCount => "legacy-daily-and-count",
            Frequency::DailyAndCount => "daily-and-count",
            Frequency::DailyAndStandard => "daily-and-standard",
        }
    }
}
