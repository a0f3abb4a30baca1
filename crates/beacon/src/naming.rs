//! Pixel naming rules
//!
//! Wire names are derived, never hand-assembled at call sites: an optional
//! call-site prefix, then the experiment and platform prefix rules. The
//! frequency policies reserve a handful of suffixes they append themselves;
//! [`check_name`] reports identifiers that collide with them.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use beacon_core::event::EventKind;
use beacon_core::platform::Platform;
use beacon_core::wire::suffix;
use beacon_core::Frequency;

/// Names with this prefix identify experiment pixels, which skip platform
/// prefixing and get a platform suffix instead.
const EXPERIMENT_PREFIX: &str = "experiment";

const DEBUG_SEGMENT: &str = "debug_";

/// A violated identifier rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameViolation {
    /// Pixel names must not contain `.`.
    ContainsDot,
    /// The name ends with a suffix the frequency policy appends itself.
    ReservedSuffix(&'static str),
    /// A unique-by-name pixel identifier must end with `_u`.
    MissingUniqueSuffix,
}

impl NameViolation {
    /// Fatal violations drop the fire; the rest are advisory.
    pub fn is_fatal(&self) -> bool {
        matches!(self, NameViolation::MissingUniqueSuffix)
    }
}

impl fmt::Display for NameViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameViolation::ContainsDot => write!(f, "must not contain '.'"),
            NameViolation::ReservedSuffix(suffix) => write!(f, "must not end with {}", suffix),
            NameViolation::MissingUniqueSuffix => write!(f, "must end with _u"),
        }
    }
}

/// Check a wire base name against the rules for `frequency`.
pub fn check_name(name: &str, frequency: Frequency) -> Vec<NameViolation> {
    let mut violations = Vec::new();

    if name.contains('.') {
        violations.push(NameViolation::ContainsDot);
    }

    let reserved: &[&'static str] = match frequency {
        Frequency::Standard
        | Frequency::LegacyInitial
        | Frequency::LegacyDaily
        | Frequency::Daily => &[suffix::UNIQUE, suffix::LEGACY_DAILY],
        Frequency::UniqueByName => &[suffix::LEGACY_DAILY],
        Frequency::UniqueByNameAndParameters => &[],
        Frequency::LegacyDailyAndCount => {
            &[suffix::UNIQUE, suffix::LEGACY_DAILY, suffix::LEGACY_COUNT]
        }
        Frequency::DailyAndCount => &[suffix::UNIQUE, suffix::DAILY, suffix::COUNT],
        Frequency::DailyAndStandard => &[suffix::UNIQUE, suffix::DAILY],
    };
    for &reserved_suffix in reserved {
        if name.ends_with(reserved_suffix) {
            violations.push(NameViolation::ReservedSuffix(reserved_suffix));
        }
    }

    if frequency == Frequency::UniqueByName && !name.ends_with(suffix::UNIQUE) {
        violations.push(NameViolation::MissingUniqueSuffix);
    }

    violations
}

/// Derive the wire base name for an event.
///
/// The call-site prefix is prepended before any other rule. Experiment names
/// get the platform suffix and nothing else. On platforms with a canonical
/// prefix, already-prefixed names pass through, debug events get the debug
/// segment, and non-standard events go out verbatim. Without a platform the
/// name is transmitted as given.
pub fn wire_name(
    kind: EventKind,
    name: &str,
    prefix: Option<&str>,
    platform: Option<Platform>,
) -> String {
    let name = match prefix {
        Some(prefix) => format!("{}{}", prefix, name),
        None => name.to_string(),
    };

    if name.starts_with(EXPERIMENT_PREFIX) {
        return match platform {
            Some(platform) => format!("{}{}", name, platform.experiment_suffix()),
            None => name,
        };
    }

    let platform_prefix = match platform.and_then(|p| p.wire_prefix()) {
        Some(platform_prefix) => platform_prefix,
        None => return name,
    };

    if name.starts_with(platform_prefix) {
        return name;
    }

    match kind {
        EventKind::Standard => format!("{}{}", platform_prefix, name),
        EventKind::Debug => format!("{}{}{}", platform_prefix, DEBUG_SEGMENT, name),
        EventKind::NonStandard => name,
    }
}

/// Storage key for a parameter-keyed unique pixel: the name joined with the
/// parameters serialized in sorted key order, so logically equal parameter
/// sets collide and differing sets do not.
pub fn dedup_key(name: &str, parameters: &HashMap<String, String>) -> String {
    if parameters.is_empty() {
        return name.to_string();
    }

    let sorted: BTreeMap<&str, &str> = parameters
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let serialized = serde_json::to_string(&sorted).unwrap_or_default();
    format!("{}{}", name, serialized)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAC: Option<Platform> = Some(Platform::MacDmg);

    #[test]
    fn standard_names_get_platform_prefix() {
        assert_eq!(
            wire_name(EventKind::Standard, "settings_opened", None, MAC),
            "m_mac_settings_opened"
        );
    }

    #[test]
    fn already_prefixed_names_pass_through() {
        assert_eq!(
            wire_name(EventKind::Standard, "m_mac_settings_opened", None, MAC),
            "m_mac_settings_opened"
        );
        assert_eq!(
            wire_name(EventKind::Debug, "m_mac_crash", None, MAC),
            "m_mac_crash"
        );
    }

    #[test]
    fn debug_events_get_debug_segment() {
        assert_eq!(
            wire_name(EventKind::Debug, "test_event", None, MAC),
            "m_mac_debug_test_event"
        );
    }

    #[test]
    fn non_standard_events_go_out_verbatim() {
        assert_eq!(
            wire_name(EventKind::NonStandard, "epbf_macos_default", None, MAC),
            "epbf_macos_default"
        );
    }

    #[test]
    fn experiment_names_get_platform_suffix() {
        assert_eq!(
            wire_name(EventKind::Standard, "experiment_enroll", None, MAC),
            "experiment_enroll_mac"
        );
        assert_eq!(
            wire_name(
                EventKind::Standard,
                "experiment_enroll",
                None,
                Some(Platform::Phone)
            ),
            "experiment_enroll_ios_phone"
        );
        assert_eq!(
            wire_name(
                EventKind::Standard,
                "experiment_enroll",
                None,
                Some(Platform::Tablet)
            ),
            "experiment_enroll_ios_tablet"
        );
    }

    #[test]
    fn phone_and_missing_platform_pass_names_through() {
        assert_eq!(
            wire_name(EventKind::Standard, "settings_opened", None, Some(Platform::Phone)),
            "settings_opened"
        );
        assert_eq!(
            wire_name(EventKind::Debug, "crash", None, None),
            "crash"
        );
    }

    #[test]
    fn call_site_prefix_applies_before_platform_rules() {
        assert_eq!(
            wire_name(EventKind::Standard, "connect", Some("vpn_"), MAC),
            "m_mac_vpn_connect"
        );
        // A prefix that already carries the platform prefix suppresses it.
        assert_eq!(
            wire_name(EventKind::Standard, "connect", Some("m_mac_vpn_"), MAC),
            "m_mac_vpn_connect"
        );
    }

    #[test]
    fn check_name_rejects_dots_for_every_frequency() {
        for frequency in [
            Frequency::Standard,
            Frequency::UniqueByName,
            Frequency::DailyAndCount,
        ] {
            assert!(check_name("bad.name", frequency).contains(&NameViolation::ContainsDot));
        }
    }

    #[test]
    fn check_name_flags_reserved_suffixes() {
        assert_eq!(
            check_name("pixel_u", Frequency::Standard),
            vec![NameViolation::ReservedSuffix(suffix::UNIQUE)]
        );
        assert_eq!(
            check_name("pixel_d", Frequency::Daily),
            vec![NameViolation::ReservedSuffix(suffix::LEGACY_DAILY)]
        );
        assert_eq!(
            check_name("pixel_count", Frequency::DailyAndCount),
            vec![NameViolation::ReservedSuffix(suffix::COUNT)]
        );
        assert_eq!(
            check_name("pixel_c", Frequency::LegacyDailyAndCount),
            vec![NameViolation::ReservedSuffix(suffix::LEGACY_COUNT)]
        );
        assert!(check_name("pixel_count", Frequency::DailyAndStandard).is_empty());
    }

    #[test]
    fn unique_pixels_require_the_unique_suffix() {
        let violations = check_name("no_suffix", Frequency::UniqueByName);
        assert!(violations.contains(&NameViolation::MissingUniqueSuffix));
        assert!(violations.iter().any(|v| v.is_fatal()));

        assert!(check_name("with_suffix_u", Frequency::UniqueByName).is_empty());
        assert!(check_name("anything_goes", Frequency::UniqueByNameAndParameters).is_empty());
    }

    #[test]
    fn dedup_key_ignores_parameter_order() {
        let mut ab = HashMap::new();
        ab.insert("a".to_string(), "100".to_string());
        ab.insert("c".to_string(), "300".to_string());

        let mut ba = HashMap::new();
        ba.insert("c".to_string(), "300".to_string());
        ba.insert("a".to_string(), "100".to_string());

        assert_eq!(dedup_key("pixel", &ab), dedup_key("pixel", &ba));
    }

    #[test]
    fn dedup_key_distinguishes_parameter_sets() {
        let mut a = HashMap::new();
        a.insert("a".to_string(), "100".to_string());

        let mut b = HashMap::new();
        b.insert("b".to_string(), "200".to_string());

        assert_ne!(dedup_key("pixel", &a), dedup_key("pixel", &b));
        assert_eq!(dedup_key("pixel", &HashMap::new()), "pixel");
    }
}
