//! Command-backed platform primitives.
//!
//! Each primitive is a configured helper command run as a subprocess. A
//! zero exit status means the primitive succeeded; anything else is an
//! explicit denial carrying the command's stderr.

use std::process::Stdio;
use std::time::Duration;

use monitor::{CapabilityKind, Error, Platform, Result, SettingsOpener};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::PlatformConfig;

pub struct CommandPlatform {
    config: PlatformConfig,
}

impl CommandPlatform {
    pub fn new(config: PlatformConfig) -> Self {
        Self { config }
    }
}

/// Run `argv` (plus an optional trailing argument) and return its stdout.
async fn run(name: &str, argv: Option<&[String]>, extra: Option<&str>) -> Result<String> {
    let Some((program, args)) = argv.and_then(|argv| argv.split_first()) else {
        return Err(Error::Unsupported(format!("no `{name}` command configured")));
    };

    let mut cmd = Command::new(program);
    cmd.args(args)
        .args(extra)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = cmd.output().await?;
    debug!(name, status = %output.status, "platform command finished");

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Denied(format!(
            "{program} exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

impl Platform for CommandPlatform {
    async fn run_script(&self, script: &str, timeout: Duration) -> Result<String> {
        // The script keeps running after a timeout; only the wait is abandoned.
        let argv = self.config.script.clone();
        let script = script.to_string();
        let task = tokio::spawn(async move { run("script", argv.as_deref(), Some(&script)).await });

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => Err(Error::Platform(format!("script task failed: {err}"))),
            Err(_) => Err(Error::Timeout(timeout)),
        }
    }

    async fn screen_capture_preflight(&self) -> bool {
        run("screen_preflight", self.config.screen_preflight.as_deref(), None)
            .await
            .is_ok()
    }

    async fn enumerate_shareable_content(&self) -> Result<()> {
        run("screen_content", self.config.screen_content.as_deref(), None).await?;
        Ok(())
    }

    async fn accessibility_trusted(&self, prompt: bool) -> bool {
        let (name, argv) = if prompt {
            ("accessibility_prompt", self.config.accessibility_prompt.as_deref())
        } else {
            ("accessibility_trusted", self.config.accessibility_trusted.as_deref())
        };
        run(name, argv, None).await.is_ok()
    }

    async fn focused_window_probe(&self) -> Result<()> {
        run("focused_windows", self.config.focused_windows.as_deref(), None).await?;
        Ok(())
    }
}

/// Opens remediation links with a configured command (`open`, `xdg-open`).
///
/// Must be called from within a tokio runtime; the child is reaped there.
pub struct CommandOpener {
    argv: Option<Vec<String>>,
}

impl CommandOpener {
    pub fn new(argv: Option<Vec<String>>) -> Self {
        Self { argv }
    }
}

impl SettingsOpener for CommandOpener {
    fn open(&self, kind: CapabilityKind, link: &str) -> Result<()> {
        let Some((program, args)) = self.argv.as_deref().and_then(|argv| argv.split_first()) else {
            eprintln!("Grant {kind} in system settings: {link}");
            return Ok(());
        };

        let mut child = Command::new(program)
            .args(args)
            .arg(link)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if !status.success() => warn!(%kind, %status, "settings opener failed"),
                Ok(_) => {}
                Err(err) => warn!(%kind, error = %err, "failed to wait for settings opener"),
            }
        });
        Ok(())
    }
}
