use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Capability kinds tracked by the monitor.
///
/// Variant order is registry order: `ALL`, `Ord`, and every ordered listing
/// of kinds follow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    /// Scripting automation of other applications.
    Automation,
    /// Screen recording and window content capture.
    ScreenCapture,
    /// Input accessibility (synthetic keystrokes, window inspection).
    Accessibility,
}

/// Static, registry-owned description of a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityMetadata {
    pub display_name: &'static str,
    pub rationale: &'static str,
    pub remediation_link: &'static str,
}

const AUTOMATION: CapabilityMetadata = CapabilityMetadata {
    display_name: "Automation",
    rationale: "Required to launch and control terminal applications",
    remediation_link: "x-apple.systempreferences:com.apple.preference.security?Privacy_Automation",
};

const SCREEN_CAPTURE: CapabilityMetadata = CapabilityMetadata {
    display_name: "Screen Recording",
    rationale: "Required for screen capture and tracking terminal windows",
    remediation_link: "x-apple.systempreferences:com.apple.preference.security?Privacy_ScreenCapture",
};

const ACCESSIBILITY: CapabilityMetadata = CapabilityMetadata {
    display_name: "Accessibility",
    rationale: "Required to send keystrokes to terminal windows",
    remediation_link: "x-apple.systempreferences:com.apple.preference.security?Privacy_Accessibility",
};

impl CapabilityKind {
    /// Every kind, in registry order.
    pub const ALL: [CapabilityKind; 3] = [
        CapabilityKind::Automation,
        CapabilityKind::ScreenCapture,
        CapabilityKind::Accessibility,
    ];

    pub fn metadata(self) -> &'static CapabilityMetadata {
        match self {
            CapabilityKind::Automation => &AUTOMATION,
            CapabilityKind::ScreenCapture => &SCREEN_CAPTURE,
            CapabilityKind::Accessibility => &ACCESSIBILITY,
        }
    }

    pub fn display_name(self) -> &'static str {
        self.metadata().display_name
    }

    /// Stable snake_case identifier, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            CapabilityKind::Automation => "automation",
            CapabilityKind::ScreenCapture => "screen_capture",
            CapabilityKind::Accessibility => "accessibility",
        }
    }

    /// Whether the probe for this kind is expensive or volatile enough to
    /// sit behind the TTL cache.
    pub fn is_cacheable(self) -> bool {
        matches!(self, CapabilityKind::ScreenCapture)
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for CapabilityKind {
    type Err = Error;

    /// Accepts the snake_case identifier, a hyphenated form, or a short alias.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "automation" | "applescript" | "apple_script" => Ok(CapabilityKind::Automation),
            "screen_capture" | "screen_recording" | "screen" => Ok(CapabilityKind::ScreenCapture),
            "accessibility" | "ax" => Ok(CapabilityKind::Accessibility),
            _ => Err(Error::UnknownCapability(s.to_string())),
        }
    }
}
