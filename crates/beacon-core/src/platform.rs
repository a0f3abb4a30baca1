//! Platform tags
//!
//! The shipping platform is a runtime value handed to the dispatcher at
//! construction, not a compile-time condition. It decides the `pixelSource`
//! parameter, the client header, and the wire-name prefix rules.

use serde::{Deserialize, Serialize};

/// Where the embedding application ships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    /// macOS build distributed through the App Store.
    MacAppStore,
    /// macOS build distributed as a DMG.
    MacDmg,
    /// iOS build running on a phone.
    Phone,
    /// iOS build running on a tablet.
    Tablet,
}

impl Platform {
    /// Value of the `pixelSource` parameter.
    pub fn source_tag(&self) -> &'static str {
        match self {
            Platform::MacAppStore => "browser-appstore",
            Platform::MacDmg => "browser-dmg",
            Platform::Phone => "phone",
            Platform::Tablet => "tablet",
        }
    }

    /// Value of the client header.
    pub fn client_name(&self) -> &'static str {
        match self {
            Platform::MacAppStore | Platform::MacDmg => "macOS",
            Platform::Phone => "iOS",
            Platform::Tablet => "iPadOS",
        }
    }

    /// Suffix appended to experiment pixel names.
    pub fn experiment_suffix(&self) -> &'static str {
        match self {
            Platform::MacAppStore | Platform::MacDmg => "_mac",
            Platform::Phone => "_ios_phone",
            Platform::Tablet => "_ios_tablet",
        }
    }

    /// Canonical prefix for standard pixels, when the platform has one.
    pub fn wire_prefix(&self) -> Option<&'static str> {
        match self {
            Platform::MacAppStore | Platform::MacDmg => Some("m_mac_"),
            Platform::Phone | Platform::Tablet => None,
        }
    }
}
