//! Per-kind verification strategies.
//!
//! Each capability kind has its own check algorithm and request flow. They
//! are modelled as one closed enum so a pass can iterate every kind through
//! the same `check` entry point.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use capability::CapabilityKind;
use tokio::time;
use tracing::{debug, info, warn};

use crate::{Error, MonitorConfig, Platform, Result};

/// Benign script that runs without any automation permission.
pub(crate) const CHECK_SCRIPT: &str = r#"return "test""#;

/// Script that targets another application and so provokes the automation
/// consent dialog. Only ever run from a request.
pub(crate) const TRIGGER_SCRIPT: &str = r#"tell application "Terminal"
    exists
end tell"#;

/// Result of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProbeOutcome {
    Granted,
    Denied,
    /// Timeout or cancellation: denial cannot be told apart from a
    /// transient failure.
    Inconclusive,
}

impl ProbeOutcome {
    pub fn is_granted(self) -> bool {
        self == ProbeOutcome::Granted
    }

    fn from_result<T>(kind: CapabilityKind, result: Result<T>) -> Self {
        match result {
            Ok(_) => ProbeOutcome::Granted,
            Err(err) if err.is_inconclusive() => {
                warn!(%kind, error = %err, "probe inconclusive");
                ProbeOutcome::Inconclusive
            }
            Err(err) => {
                debug!(%kind, error = %err, "probe denied");
                ProbeOutcome::Denied
            }
        }
    }
}

/// What a request flow achieved on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RequestOutcome {
    /// The capability is usable now; record it optimistically.
    Granted,
    /// The platform already trusts us; nothing left to do.
    AlreadyTrusted,
    /// A prompt may be showing; open settings after `fallback_delay`.
    Prompted { fallback_delay: Duration },
}

/// Verification algorithm for one capability kind.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ProbeStrategy {
    Automation {
        check_timeout: Duration,
        request_timeout: Duration,
        settings_delay: Duration,
    },
    ScreenCapture {
        fallback_timeout: Duration,
        request_timeout: Duration,
        settings_delay: Duration,
    },
    Accessibility {
        settings_delay: Duration,
    },
}

impl ProbeStrategy {
    pub fn for_kind(kind: CapabilityKind, config: &MonitorConfig) -> Self {
        match kind {
            CapabilityKind::Automation => ProbeStrategy::Automation {
                check_timeout: config.script_check_timeout(),
                request_timeout: config.script_request_timeout(),
                settings_delay: config.automation_settings_delay(),
            },
            CapabilityKind::ScreenCapture => ProbeStrategy::ScreenCapture {
                fallback_timeout: config.capture_fallback_timeout(),
                request_timeout: config.script_request_timeout(),
                settings_delay: config.settings_fallback_delay(),
            },
            CapabilityKind::Accessibility => ProbeStrategy::Accessibility {
                settings_delay: config.settings_fallback_delay(),
            },
        }
    }

    pub fn kind(&self) -> CapabilityKind {
        match self {
            ProbeStrategy::Automation { .. } => CapabilityKind::Automation,
            ProbeStrategy::ScreenCapture { .. } => CapabilityKind::ScreenCapture,
            ProbeStrategy::Accessibility { .. } => CapabilityKind::Accessibility,
        }
    }

    /// Determine the current grant state without prompting the user.
    pub async fn check<P: Platform>(self, platform: Arc<P>) -> ProbeOutcome {
        let kind = self.kind();
        match self {
            ProbeStrategy::Automation { check_timeout, .. } => {
                let result = platform.run_script(CHECK_SCRIPT, check_timeout).await;
                ProbeOutcome::from_result(kind, result)
            }
            ProbeStrategy::ScreenCapture {
                fallback_timeout, ..
            } => {
                if platform.screen_capture_preflight().await {
                    debug!("screen capture confirmed by preflight");
                    return ProbeOutcome::Granted;
                }

                // Preflight can report false negatives; confirm by actually
                // enumerating content, but never wait on it for long.
                debug!("preflight negative, enumerating shareable content");
                let result = detached(fallback_timeout, {
                    let platform = Arc::clone(&platform);
                    async move { platform.enumerate_shareable_content().await }
                })
                .await;
                ProbeOutcome::from_result(kind, result)
            }
            ProbeStrategy::Accessibility { .. } => {
                let trusted = platform.accessibility_trusted(false).await;
                match platform.focused_window_probe().await {
                    Ok(()) => ProbeOutcome::Granted,
                    Err(err) => {
                        if trusted {
                            debug!(error = %err, "trust API reports trusted but window probe failed");
                        }
                        ProbeOutcome::from_result(kind, Err::<(), _>(err))
                    }
                }
            }
        }
    }

    /// Provoke the platform's consent mechanism for this kind.
    ///
    /// Failures are swallowed: the only visible effect of a request is a
    /// later change in grant state.
    pub async fn request<P: Platform>(self, platform: Arc<P>) -> RequestOutcome {
        match self {
            ProbeStrategy::Automation {
                request_timeout,
                settings_delay,
                ..
            } => match platform.run_script(TRIGGER_SCRIPT, request_timeout).await {
                Ok(_) => {
                    info!("automation permission granted");
                    RequestOutcome::Granted
                }
                Err(err) => {
                    info!(error = %err, "automation permission dialog triggered");
                    RequestOutcome::Prompted {
                        fallback_delay: settings_delay,
                    }
                }
            },
            ProbeStrategy::ScreenCapture {
                request_timeout,
                settings_delay,
                ..
            } => {
                if platform.screen_capture_preflight().await {
                    info!("screen recording permission already granted");
                    return RequestOutcome::Granted;
                }

                let result = detached(request_timeout, {
                    let platform = Arc::clone(&platform);
                    async move { platform.enumerate_shareable_content().await }
                })
                .await;
                match result {
                    Ok(()) => {
                        info!("screen recording permission granted after prompt");
                        RequestOutcome::Granted
                    }
                    Err(err) => {
                        info!(error = %err, "screen recording permission dialog shown or denied");
                        RequestOutcome::Prompted {
                            fallback_delay: settings_delay,
                        }
                    }
                }
            }
            ProbeStrategy::Accessibility { settings_delay } => {
                if platform.accessibility_trusted(true).await {
                    info!("accessibility permission already granted");
                    RequestOutcome::AlreadyTrusted
                } else {
                    info!("accessibility permission dialog triggered");
                    RequestOutcome::Prompted {
                        fallback_delay: settings_delay,
                    }
                }
            }
        }
    }
}

/// Run `fut` in its own task and wait at most `limit` for it.
///
/// On timeout the task is left running and its eventual result discarded;
/// nothing is cancelled in flight.
pub(crate) async fn detached<T, F>(limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    match time::timeout(limit, tokio::spawn(fut)).await {
        Ok(Ok(result)) => result,
        Ok(Err(join)) if join.is_cancelled() => Err(Error::Cancelled),
        Ok(Err(join)) => Err(Error::Platform(join.to_string())),
        Err(_) => Err(Error::Timeout(limit)),
    }
}
