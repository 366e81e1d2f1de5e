//! The coordinating task and its public handle.
//!
//! Every mutation of the grant map, the probe cache, and the registration
//! counter happens inside one task (the actor). Handles, the poll loop, and
//! probe tasks only talk to it through messages, so none of that state needs
//! a lock. Probes themselves run in their own tasks and never hold up the
//! actor.

use std::sync::Arc;

use capability::CapabilityKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, WeakUnboundedSender};
use tokio::sync::{broadcast, oneshot, watch};
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::bus::{GrantsChanged, NotificationBus};
use crate::cache::ProbeCache;
use crate::lifecycle::Lifecycle;
use crate::probe::{ProbeOutcome, ProbeStrategy, RequestOutcome};
use crate::state::{GrantMap, StateStore};
use crate::{
    Error, LogOpener, MonitorConfig, PermissionPrompt, Platform, Presenter, Result,
    SettingsOpener,
};

/// Messages handled by the coordinating task.
pub(crate) enum Command {
    Register,
    Unregister,
    /// Posted by the poll loop.
    Tick,
    CheckAll {
        done: Option<oneshot::Sender<()>>,
    },
    CheckSingle {
        kind: CapabilityKind,
        reply: oneshot::Sender<bool>,
    },
    PassComplete {
        observations: Vec<Observation>,
        done: Option<oneshot::Sender<()>>,
    },
    SingleComplete {
        observation: Observation,
        reply: oneshot::Sender<bool>,
    },
    ForcedRecheck,
    Request(CapabilityKind),
    RecordGrant(CapabilityKind),
    Status(oneshot::Sender<MonitorStatus>),
}

/// A probe result as seen by the coordinating task.
pub(crate) struct Observation {
    kind: CapabilityKind,
    outcome: ProbeOutcome,
    /// `false` when served from the cache.
    fresh: bool,
}

/// Diagnostic snapshot of the monitor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorStatus {
    pub grants: GrantMap,
    pub registrations: usize,
    pub polling: bool,
    pub passes_completed: u64,
    pub last_checked_at: Option<DateTime<Utc>>,
}

/// Builder for [`Monitor`].
pub struct MonitorBuilder<P> {
    platform: Arc<P>,
    opener: Arc<dyn SettingsOpener>,
    config: MonitorConfig,
}

impl<P: Platform> MonitorBuilder<P> {
    pub fn opener(mut self, opener: impl SettingsOpener) -> Self {
        self.opener = Arc::new(opener);
        self
    }

    pub fn config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    /// Start the coordinating task on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn(self) -> Monitor {
        let (commands, inbox) = mpsc::unbounded_channel();
        let (state, grants) = StateStore::new();
        let bus = NotificationBus::new();

        let actor = Actor {
            platform: self.platform,
            opener: self.opener,
            cache: ProbeCache::new(self.config.cache_ttl()),
            lifecycle: Lifecycle::new(self.config.poll_interval()),
            config: self.config,
            state,
            bus: bus.clone(),
            commands: commands.downgrade(),
            passes_in_flight: 0,
            passes_completed: 0,
            last_checked_at: None,
        };
        tokio::spawn(actor.run(inbox));

        Monitor {
            commands,
            grants,
            bus,
        }
    }
}

/// Handle to a running capability monitor.
///
/// Cheap to clone. The monitor keeps running while at least one handle
/// exists and shuts down, stopping its poll loop, once the last is dropped.
#[derive(Clone)]
pub struct Monitor {
    commands: UnboundedSender<Command>,
    grants: watch::Receiver<GrantMap>,
    bus: NotificationBus,
}

impl Monitor {
    pub fn builder<P: Platform>(platform: Arc<P>) -> MonitorBuilder<P> {
        MonitorBuilder {
            platform,
            opener: Arc::new(LogOpener),
            config: MonitorConfig::default(),
        }
    }

    /// Last known state of `kind`. Never blocks and never probes.
    pub fn has_capability(&self, kind: CapabilityKind) -> bool {
        self.grants.borrow().get(kind)
    }

    pub fn all_granted(&self) -> bool {
        self.grants.borrow().all_granted()
    }

    /// Kinds not currently granted, in registry order.
    pub fn missing_capabilities(&self) -> Vec<CapabilityKind> {
        self.grants.borrow().missing()
    }

    /// Snapshot of the whole grant map.
    pub fn grants(&self) -> GrantMap {
        self.grants.borrow().clone()
    }

    /// Receive a [`GrantsChanged`] event each time the grant map changes.
    pub fn subscribe(&self) -> broadcast::Receiver<GrantsChanged> {
        self.bus.subscribe()
    }

    /// Register interest in live updates. The first registration starts
    /// the poll loop and an immediate check.
    pub fn register(&self) {
        self.send(Command::Register);
    }

    /// Balance an earlier [`register`](Self::register). The last one stops
    /// the poll loop.
    pub fn unregister(&self) {
        self.send(Command::Unregister);
    }

    /// Register now and unregister when the returned guard is dropped.
    pub fn watch(&self) -> Registration {
        self.register();
        Registration {
            monitor: self.clone(),
        }
    }

    /// Ask the platform for `kind`. Does nothing if already granted.
    pub fn request_capability(&self, kind: CapabilityKind) {
        self.send(Command::Request(kind));
    }

    pub fn request_all_missing(&self) {
        for kind in self.missing_capabilities() {
            self.request_capability(kind);
        }
    }

    /// Explain why `kind` is needed and request it if the user agrees.
    ///
    /// Returns whether a request was issued.
    pub fn explain_and_request(&self, kind: CapabilityKind, presenter: &impl Presenter) -> bool {
        let prompt = PermissionPrompt::for_kind(kind);
        if !presenter.confirm(&prompt) {
            debug!(%kind, "permission explanation dismissed");
            return false;
        }
        self.request_capability(kind);
        true
    }

    /// Drop cached results and recheck everything now and once more shortly
    /// after, to catch dialogs resolved while the first pass was running.
    pub fn forced_recheck(&self) {
        self.send(Command::ForcedRecheck);
    }

    /// Run one full pass and wait until its result has been applied.
    pub async fn check_all(&self) -> Result<()> {
        let (done, applied) = oneshot::channel();
        self.try_send(Command::CheckAll { done: Some(done) })?;
        applied.await.map_err(|_| Error::Closed)
    }

    /// Probe a single kind (cache-aware) without touching the grant map.
    pub async fn check_single(&self, kind: CapabilityKind) -> Result<bool> {
        let (reply, granted) = oneshot::channel();
        self.try_send(Command::CheckSingle { kind, reply })?;
        granted.await.map_err(|_| Error::Closed)
    }

    pub async fn status(&self) -> Result<MonitorStatus> {
        let (reply, status) = oneshot::channel();
        self.try_send(Command::Status(reply))?;
        status.await.map_err(|_| Error::Closed)
    }

    fn send(&self, command: Command) {
        if self.try_send(command).is_err() {
            warn!("monitor has shut down, dropping command");
        }
    }

    fn try_send(&self, command: Command) -> Result<()> {
        self.commands.send(command).map_err(|_| Error::Closed)
    }
}

/// Guard returned by [`Monitor::watch`].
pub struct Registration {
    monitor: Monitor,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.monitor.unregister();
    }
}

struct Actor<P> {
    platform: Arc<P>,
    opener: Arc<dyn SettingsOpener>,
    config: MonitorConfig,
    state: StateStore,
    cache: ProbeCache,
    lifecycle: Lifecycle,
    bus: NotificationBus,
    commands: WeakUnboundedSender<Command>,
    passes_in_flight: usize,
    passes_completed: u64,
    last_checked_at: Option<DateTime<Utc>>,
}

impl<P: Platform> Actor<P> {
    async fn run(mut self, mut inbox: UnboundedReceiver<Command>) {
        while let Some(command) = inbox.recv().await {
            self.handle(command);
        }
        self.lifecycle.stop();
        debug!("permission monitor stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Register => {
                if self.lifecycle.register(&self.commands) {
                    self.start_pass(None);
                }
            }
            Command::Unregister => {
                self.lifecycle.unregister();
            }
            Command::Tick => {
                if self.passes_in_flight > 0 {
                    debug!(in_flight = self.passes_in_flight, "previous pass still running, skipping tick");
                } else {
                    self.start_pass(None);
                }
            }
            Command::CheckAll { done } => self.start_pass(done),
            Command::CheckSingle { kind, reply } => self.start_single(kind, reply),
            Command::PassComplete { observations, done } => {
                self.finish_pass(observations);
                if let Some(done) = done {
                    let _ = done.send(());
                }
            }
            Command::SingleComplete { observation, reply } => {
                let granted = observation.outcome.is_granted();
                self.remember(&observation);
                let _ = reply.send(granted);
            }
            Command::ForcedRecheck => self.forced_recheck(),
            Command::Request(kind) => self.request(kind),
            Command::RecordGrant(kind) => {
                if kind.is_cacheable() {
                    self.cache.set(kind, true);
                }
                let candidate = self.state.current().clone().with(kind, true);
                self.commit(candidate);
            }
            Command::Status(reply) => {
                let _ = reply.send(MonitorStatus {
                    grants: self.state.current().clone(),
                    registrations: self.lifecycle.registrations(),
                    polling: self.lifecycle.is_polling(),
                    passes_completed: self.passes_completed,
                    last_checked_at: self.last_checked_at,
                });
            }
        }
    }

    fn strategy(&self, kind: CapabilityKind) -> ProbeStrategy {
        ProbeStrategy::for_kind(kind, &self.config)
    }

    fn cached(&self, kind: CapabilityKind) -> Option<Observation> {
        if !kind.is_cacheable() {
            return None;
        }
        let (granted, age) = self.cache.get(kind)?;
        debug!(%kind, granted, ?age, "using cached result");
        Some(Observation {
            kind,
            outcome: if granted {
                ProbeOutcome::Granted
            } else {
                ProbeOutcome::Denied
            },
            fresh: false,
        })
    }

    /// Store conclusive fresh results of cacheable kinds.
    fn remember(&mut self, observation: &Observation) {
        if !observation.fresh || !observation.kind.is_cacheable() {
            return;
        }
        match observation.outcome {
            ProbeOutcome::Granted => self.cache.set(observation.kind, true),
            ProbeOutcome::Denied => self.cache.set(observation.kind, false),
            ProbeOutcome::Inconclusive => {
                warn!(kind = %observation.kind, "check inconclusive, not caching result");
            }
        }
    }

    fn start_pass(&mut self, done: Option<oneshot::Sender<()>>) {
        let Some(commands) = self.commands.upgrade() else {
            return;
        };

        let mut observations = Vec::with_capacity(CapabilityKind::ALL.len());
        let mut pending = Vec::new();
        for kind in CapabilityKind::ALL {
            match self.cached(kind) {
                Some(observation) => observations.push(observation),
                None => pending.push(self.strategy(kind)),
            }
        }

        self.passes_in_flight += 1;
        let platform = Arc::clone(&self.platform);
        let limit = self.config.probe_timeout();

        tokio::spawn(async move {
            // Probes run concurrently and share one deadline.
            let deadline = Instant::now() + limit;
            let running: Vec<_> = pending
                .into_iter()
                .map(|strategy| {
                    (
                        strategy.kind(),
                        tokio::spawn(strategy.check(Arc::clone(&platform))),
                    )
                })
                .collect();

            for (kind, probe) in running {
                let outcome = match time::timeout_at(deadline, probe).await {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(err)) => {
                        warn!(%kind, error = %err, "probe task failed");
                        ProbeOutcome::Inconclusive
                    }
                    Err(_) => {
                        warn!(%kind, ?limit, "probe exceeded its timeout, discarding result");
                        ProbeOutcome::Inconclusive
                    }
                };
                observations.push(Observation {
                    kind,
                    outcome,
                    fresh: true,
                });
            }

            let _ = commands.send(Command::PassComplete { observations, done });
        });
    }

    fn finish_pass(&mut self, observations: Vec<Observation>) {
        self.passes_in_flight = self.passes_in_flight.saturating_sub(1);
        self.passes_completed += 1;
        self.last_checked_at = Some(Utc::now());

        let mut candidate = GrantMap::new();
        for observation in &observations {
            self.remember(observation);
            candidate.set(observation.kind, observation.outcome.is_granted());
        }
        self.commit(candidate);
    }

    fn start_single(&mut self, kind: CapabilityKind, reply: oneshot::Sender<bool>) {
        if let Some(observation) = self.cached(kind) {
            let _ = reply.send(observation.outcome.is_granted());
            return;
        }
        let Some(commands) = self.commands.upgrade() else {
            return;
        };

        let strategy = self.strategy(kind);
        let platform = Arc::clone(&self.platform);
        let limit = self.config.probe_timeout();

        tokio::spawn(async move {
            let probe = tokio::spawn(strategy.check(platform));
            let outcome = match time::timeout(limit, probe).await {
                Ok(Ok(outcome)) => outcome,
                _ => ProbeOutcome::Inconclusive,
            };
            let observation = Observation {
                kind,
                outcome,
                fresh: true,
            };
            let _ = commands.send(Command::SingleComplete { observation, reply });
        });
    }

    /// Replace the grant map and notify observers if it changed.
    fn commit(&mut self, candidate: GrantMap) {
        if !self.state.apply(candidate) {
            return;
        }
        let delivered = self.bus.publish();
        info!(grants = ?self.state.current(), observers = delivered, "permissions updated");
    }

    fn forced_recheck(&mut self) {
        info!("force permission recheck requested");
        self.cache.clear();
        self.state.reset();

        let (done, applied) = oneshot::channel();
        self.start_pass(Some(done));

        // The confirmation pass waits for the first one to be applied.
        let commands = self.commands.clone();
        let delay = self.config.recheck_confirm_delay();
        tokio::spawn(async move {
            if applied.await.is_err() {
                return;
            }
            time::sleep(delay).await;
            if let Some(commands) = commands.upgrade() {
                let _ = commands.send(Command::CheckAll { done: None });
            }
        });
    }

    fn request(&mut self, kind: CapabilityKind) {
        if self.state.current().get(kind) {
            debug!(%kind, "already granted, ignoring request");
            return;
        }
        info!(%kind, "requesting permission");

        let strategy = self.strategy(kind);
        let platform = Arc::clone(&self.platform);
        let opener = Arc::clone(&self.opener);
        let commands = self.commands.clone();

        tokio::spawn(async move {
            match strategy.request(platform).await {
                RequestOutcome::Granted => {
                    if let Some(commands) = commands.upgrade() {
                        let _ = commands.send(Command::RecordGrant(kind));
                    }
                }
                RequestOutcome::AlreadyTrusted => {}
                RequestOutcome::Prompted { fallback_delay } => {
                    time::sleep(fallback_delay).await;
                    if let Err(err) = opener.open(kind, kind.metadata().remediation_link) {
                        warn!(%kind, error = %err, "failed to open system settings");
                    }
                }
            }
        });
    }
}
