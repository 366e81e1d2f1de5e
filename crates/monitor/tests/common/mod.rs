//! Scripted platform doubles shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use monitor::{
    CapabilityKind, Error, Monitor, MonitorConfig, PermissionPrompt, Platform, Presenter, Result,
    SettingsOpener,
};

/// How the shareable-content enumeration behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Content {
    Grant,
    Deny,
    /// Never completes.
    Hang,
}

pub struct FakePlatform {
    pub script_ok: AtomicBool,
    pub preflight: AtomicBool,
    pub content: Mutex<Content>,
    pub trusted: AtomicBool,
    pub windows_readable: AtomicBool,
    /// Preflight never completes.
    pub preflight_hangs: AtomicBool,
    /// The focused window probe never completes.
    pub windows_hang: AtomicBool,

    pub scripts: Mutex<Vec<String>>,
    pub preflight_calls: AtomicUsize,
    pub content_calls: AtomicUsize,
    pub trust_prompts: AtomicUsize,
    pub window_probes: AtomicUsize,
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self {
            script_ok: AtomicBool::new(false),
            preflight: AtomicBool::new(false),
            content: Mutex::new(Content::Deny),
            trusted: AtomicBool::new(false),
            windows_readable: AtomicBool::new(false),
            preflight_hangs: AtomicBool::new(false),
            windows_hang: AtomicBool::new(false),
            scripts: Mutex::new(Vec::new()),
            preflight_calls: AtomicUsize::new(0),
            content_calls: AtomicUsize::new(0),
            trust_prompts: AtomicUsize::new(0),
            window_probes: AtomicUsize::new(0),
        }
    }
}

impl FakePlatform {
    pub fn set_script_ok(&self, ok: bool) {
        self.script_ok.store(ok, Ordering::SeqCst);
    }

    pub fn set_preflight(&self, granted: bool) {
        self.preflight.store(granted, Ordering::SeqCst);
    }

    pub fn set_content(&self, content: Content) {
        *self.content.lock().unwrap() = content;
    }

    pub fn set_accessibility(&self, trusted: bool, windows_readable: bool) {
        self.trusted.store(trusted, Ordering::SeqCst);
        self.windows_readable.store(windows_readable, Ordering::SeqCst);
    }

    pub fn set_preflight_hangs(&self, hangs: bool) {
        self.preflight_hangs.store(hangs, Ordering::SeqCst);
    }

    pub fn set_windows_hang(&self, hangs: bool) {
        self.windows_hang.store(hangs, Ordering::SeqCst);
    }

    pub fn scripts(&self) -> Vec<String> {
        self.scripts.lock().unwrap().clone()
    }

    pub fn content_calls(&self) -> usize {
        self.content_calls.load(Ordering::SeqCst)
    }

    pub fn preflight_calls(&self) -> usize {
        self.preflight_calls.load(Ordering::SeqCst)
    }

    pub fn trust_prompts(&self) -> usize {
        self.trust_prompts.load(Ordering::SeqCst)
    }
}

impl Platform for FakePlatform {
    async fn run_script(&self, script: &str, _timeout: Duration) -> Result<String> {
        self.scripts.lock().unwrap().push(script.to_string());
        if self.script_ok.load(Ordering::SeqCst) {
            Ok("test".to_string())
        } else {
            Err(Error::Denied("not authorized to send Apple events".into()))
        }
    }

    async fn screen_capture_preflight(&self) -> bool {
        self.preflight_calls.fetch_add(1, Ordering::SeqCst);
        if self.preflight_hangs.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.preflight.load(Ordering::SeqCst)
    }

    async fn enumerate_shareable_content(&self) -> Result<()> {
        self.content_calls.fetch_add(1, Ordering::SeqCst);
        let content = *self.content.lock().unwrap();
        match content {
            Content::Grant => Ok(()),
            Content::Deny => Err(Error::Denied("user declined screen recording".into())),
            Content::Hang => std::future::pending().await,
        }
    }

    async fn accessibility_trusted(&self, prompt: bool) -> bool {
        if prompt {
            self.trust_prompts.fetch_add(1, Ordering::SeqCst);
        }
        self.trusted.load(Ordering::SeqCst)
    }

    async fn focused_window_probe(&self) -> Result<()> {
        self.window_probes.fetch_add(1, Ordering::SeqCst);
        if self.windows_hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.windows_readable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::Platform("cannot read focused application windows".into()))
        }
    }
}

/// Records every remediation link it is asked to open.
#[derive(Clone, Default)]
pub struct RecordingOpener {
    pub opened: Arc<Mutex<Vec<(CapabilityKind, String)>>>,
}

impl RecordingOpener {
    pub fn opened(&self) -> Vec<(CapabilityKind, String)> {
        self.opened.lock().unwrap().clone()
    }
}

impl SettingsOpener for RecordingOpener {
    fn open(&self, kind: CapabilityKind, link: &str) -> Result<()> {
        self.opened.lock().unwrap().push((kind, link.to_string()));
        Ok(())
    }
}

/// Presenter with a fixed answer that remembers what it was shown.
pub struct FixedPresenter {
    pub answer: bool,
    pub shown: Mutex<Vec<PermissionPrompt>>,
}

impl FixedPresenter {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            shown: Mutex::new(Vec::new()),
        }
    }
}

impl Presenter for FixedPresenter {
    fn confirm(&self, prompt: &PermissionPrompt) -> bool {
        self.shown.lock().unwrap().push(prompt.clone());
        self.answer
    }
}

pub fn spawn(platform: &Arc<FakePlatform>) -> (Monitor, RecordingOpener) {
    spawn_with(platform, MonitorConfig::default())
}

pub fn spawn_with(platform: &Arc<FakePlatform>, config: MonitorConfig) -> (Monitor, RecordingOpener) {
    let opener = RecordingOpener::default();
    let monitor = Monitor::builder(Arc::clone(platform))
        .opener(opener.clone())
        .config(config)
        .spawn();
    (monitor, opener)
}
