//! Grant map and diff-based change detection.

use std::collections::BTreeMap;

use capability::CapabilityKind;
use serde::Serialize;
use tokio::sync::watch;

/// Granted state of every capability kind.
///
/// Every kind is always present; iteration follows registry order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GrantMap(BTreeMap<CapabilityKind, bool>);

impl Default for GrantMap {
    fn default() -> Self {
        Self(CapabilityKind::ALL.into_iter().map(|k| (k, false)).collect())
    }
}

impl GrantMap {
    /// All kinds not granted.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: CapabilityKind) -> bool {
        self.0.get(&kind).copied().unwrap_or(false)
    }

    pub fn set(&mut self, kind: CapabilityKind, granted: bool) {
        self.0.insert(kind, granted);
    }

    pub fn with(mut self, kind: CapabilityKind, granted: bool) -> Self {
        self.set(kind, granted);
        self
    }

    pub fn all_granted(&self) -> bool {
        self.0.values().all(|granted| *granted)
    }

    /// Kinds not granted, in registry order.
    pub fn missing(&self) -> Vec<CapabilityKind> {
        self.iter()
            .filter_map(|(kind, granted)| (!granted).then_some(kind))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CapabilityKind, bool)> + '_ {
        self.0.iter().map(|(kind, granted)| (*kind, *granted))
    }
}

/// Authoritative grant map, owned by the coordinating task.
///
/// Each replacement is mirrored into a `watch` channel so handles can read
/// the last applied snapshot without a round trip.
pub(crate) struct StateStore {
    current: GrantMap,
    published: watch::Sender<GrantMap>,
}

impl StateStore {
    pub fn new() -> (Self, watch::Receiver<GrantMap>) {
        let (published, snapshot) = watch::channel(GrantMap::new());
        let store = Self {
            current: GrantMap::new(),
            published,
        };
        (store, snapshot)
    }

    pub fn current(&self) -> &GrantMap {
        &self.current
    }

    /// Replace the stored map if `candidate` differs from it.
    ///
    /// Returns whether anything changed; identical candidates are a no-op.
    pub fn apply(&mut self, candidate: GrantMap) -> bool {
        if candidate == self.current {
            return false;
        }
        self.current = candidate;
        self.published.send_replace(self.current.clone());
        true
    }

    /// Forget every grant without reporting a change.
    pub fn reset(&mut self) {
        self.current = GrantMap::new();
        self.published.send_replace(self.current.clone());
    }
}
