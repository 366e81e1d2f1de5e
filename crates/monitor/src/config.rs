//! Monitor timing configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing knobs for polling, caching, probing, and request fallbacks.
///
/// All durations are stored in milliseconds so the struct maps directly onto
/// a `[monitor]` TOML table. Every field is optional in serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Interval between background passes while at least one observer is
    /// registered.
    pub poll_interval_ms: u64,

    /// How long a conclusive screen capture observation stays valid.
    pub cache_ttl_ms: u64,

    /// Upper bound on any single probe within a pass.
    pub probe_timeout_ms: u64,

    /// Bound on the shareable-content enumeration fallback.
    pub capture_fallback_timeout_ms: u64,

    /// Timeout for the benign automation check script.
    pub script_check_timeout_ms: u64,

    /// Timeout for the privileged automation script run by a request, and
    /// for the prompting screen capture request.
    pub script_request_timeout_ms: u64,

    /// Delay between the immediate and the confirmation pass of a forced
    /// recheck.
    pub recheck_confirm_delay_ms: u64,

    /// Delay before opening settings after an automation request.
    pub automation_settings_delay_ms: u64,

    /// Delay before opening settings after a screen capture or
    /// accessibility request.
    pub settings_fallback_delay_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            cache_ttl_ms: 5_000,
            probe_timeout_ms: 3_000,
            capture_fallback_timeout_ms: 2_000,
            script_check_timeout_ms: 1_000,
            script_request_timeout_ms: 15_000,
            recheck_confirm_delay_ms: 500,
            automation_settings_delay_ms: 500,
            settings_fallback_delay_ms: 1_000,
        }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        // A zero period would make `tokio::time::interval` panic.
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn capture_fallback_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_fallback_timeout_ms)
    }

    pub fn script_check_timeout(&self) -> Duration {
        Duration::from_millis(self.script_check_timeout_ms)
    }

    pub fn script_request_timeout(&self) -> Duration {
        Duration::from_millis(self.script_request_timeout_ms)
    }

    pub fn recheck_confirm_delay(&self) -> Duration {
        Duration::from_millis(self.recheck_confirm_delay_ms)
    }

    pub fn automation_settings_delay(&self) -> Duration {
        Duration::from_millis(self.automation_settings_delay_ms)
    }

    pub fn settings_fallback_delay(&self) -> Duration {
        Duration::from_millis(self.settings_fallback_delay_ms)
    }
}
