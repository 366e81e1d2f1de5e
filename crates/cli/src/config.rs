//! Configuration loading from permwatch.toml.

use monitor::MonitorConfig;
use serde::Deserialize;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Polling, caching, and timeout settings.
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Commands backing each platform primitive.
    #[serde(default)]
    pub platform: PlatformConfig,
}

/// Command lines backing each platform primitive.
///
/// Each entry is an argv; a primitive succeeds when its command exits 0.
/// Unset entries make the matching probe report "not granted".
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Script runner; the script is appended as the last argument.
    pub script: Option<Vec<String>>,

    /// Non-prompting screen capture check.
    pub screen_preflight: Option<Vec<String>>,

    /// Shareable content enumeration (may prompt).
    pub screen_content: Option<Vec<String>>,

    /// Accessibility trust check.
    pub accessibility_trusted: Option<Vec<String>>,

    /// Accessibility trust check that also shows the trust dialog.
    pub accessibility_prompt: Option<Vec<String>>,

    /// Read the focused application's window list.
    pub focused_windows: Option<Vec<String>>,

    /// Settings opener; the remediation link is appended.
    pub open: Option<Vec<String>>,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            script: default_script(),
            screen_preflight: None,
            screen_content: None,
            accessibility_trusted: None,
            accessibility_prompt: None,
            focused_windows: None,
            open: default_open(),
        }
    }
}

fn default_script() -> Option<Vec<String>> {
    if cfg!(target_os = "macos") {
        Some(vec!["osascript".to_string(), "-e".to_string()])
    } else {
        None
    }
}

fn default_open() -> Option<Vec<String>> {
    if cfg!(target_os = "macos") {
        Some(vec!["open".to_string()])
    } else if cfg!(target_os = "linux") {
        Some(vec!["xdg-open".to_string()])
    } else {
        None
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),
}
