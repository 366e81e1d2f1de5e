//! Injected platform collaborators.
//!
//! The monitor never talks to the operating system directly. Each capability
//! probe is built on one or two opaque primitives supplied by the host
//! through [`Platform`]; remediation and explain-and-request UX go through
//! [`SettingsOpener`] and [`Presenter`].

use std::future::Future;
use std::time::Duration;

use capability::CapabilityKind;
use tracing::info;

use crate::Result;

/// Platform primitives backing the capability probes.
///
/// Implementations handle the specifics of a host (native APIs, helper
/// commands, test doubles). None of these calls need to bound their own
/// latency except `run_script`, which receives its timeout explicitly.
pub trait Platform: Send + Sync + 'static {
    /// Run an automation script and return its output.
    fn run_script(
        &self,
        script: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Non-prompting, side-effect-free screen capture check.
    fn screen_capture_preflight(&self) -> impl Future<Output = bool> + Send;

    /// Enumerate shareable screen content. Succeeds only when capture is
    /// actually permitted; may prompt the user on first use.
    fn enumerate_shareable_content(&self) -> impl Future<Output = Result<()>> + Send;

    /// Cheap accessibility trust check. With `prompt` set, the host should
    /// also surface its trust dialog.
    fn accessibility_trusted(&self, prompt: bool) -> impl Future<Output = bool> + Send;

    /// Read the focused application's window list. Succeeds only when
    /// accessibility access is functional, not merely recorded as trusted.
    fn focused_window_probe(&self) -> impl Future<Output = Result<()>> + Send;
}

/// Opens the platform settings location where a capability is granted.
pub trait SettingsOpener: Send + Sync + 'static {
    fn open(&self, kind: CapabilityKind, link: &str) -> Result<()>;
}

/// Opener that only records the remediation link in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOpener;

impl SettingsOpener for LogOpener {
    fn open(&self, kind: CapabilityKind, link: &str) -> Result<()> {
        info!(%kind, link, "grant this capability in system settings");
        Ok(())
    }
}

/// An explanation shown before requesting a capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionPrompt {
    pub kind: CapabilityKind,
    pub title: String,
    pub body: String,
    pub confirm_label: &'static str,
    pub cancel_label: &'static str,
}

impl PermissionPrompt {
    /// Build the explain-and-request prompt from registry metadata.
    pub fn for_kind(kind: CapabilityKind) -> Self {
        let meta = kind.metadata();
        Self {
            kind,
            title: format!("{} Permission Required", meta.display_name),
            body: format!(
                "This application needs {name} permission.\n\n{rationale}\n\n\
                 Please grant permission in System Settings > Privacy & Security > {name}.",
                name = meta.display_name,
                rationale = meta.rationale,
            ),
            confirm_label: "Open System Settings",
            cancel_label: "Cancel",
        }
    }
}

/// Presents a [`PermissionPrompt`] and reports whether the user confirmed.
pub trait Presenter {
    fn confirm(&self, prompt: &PermissionPrompt) -> bool;
}
