//! Wire-level constants: parameter keys, header names, reserved name
//! suffixes, and storage key prefixes.

/// Standard parameter keys appended by the dispatcher.
pub mod params {
    pub const APP_VERSION: &str = "appVersion";
    pub const PIXEL_SOURCE: &str = "pixelSource";
    pub const TEST: &str = "test";
    pub const TEST_VALUE: &str = "1";
    pub const ERROR: &str = "error";
    pub const ERROR_CHAIN: &str = "error_chain";
}

/// Header names composed onto every request.
pub mod headers {
    pub const ACCEPT_ENCODING: &str = "Accept-Encoding";
    pub const ACCEPT_LANGUAGE: &str = "Accept-Language";
    pub const USER_AGENT: &str = "User-Agent";
    pub const IF_NONE_MATCH: &str = "If-None-Match";
    pub const MORE_INFO: &str = "X-Beacon-More-Info";
    pub const CLIENT: &str = "X-Beacon-Client";
}

/// Name suffixes reserved by the frequency policies.
pub mod suffix {
    pub const UNIQUE: &str = "_u";
    pub const LEGACY_DAILY: &str = "_d";
    pub const LEGACY_COUNT: &str = "_c";
    pub const DAILY: &str = "_daily";
    pub const COUNT: &str = "_count";
}

/// Timestamp-store key layout. Reads fall back to the legacy prefix so
/// history recorded by older builds keeps gating pixels after an upgrade.
pub mod storage {
    pub const KEY_PREFIX: &str = "beacon.pixel.";
    pub const LEGACY_KEY_PREFIX: &str = "beacon.telemetry.pixel.";
    pub const DRY_RUN_KEY_SUFFIX: &str = ".dry-run";
}
