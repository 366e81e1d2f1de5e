//! TTL cache for expensive or volatile probes.

use std::collections::HashMap;
use std::time::Duration;

use capability::CapabilityKind;
use tokio::time::Instant;

/// A conclusive observation and when it was made.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CacheEntry {
    pub granted: bool,
    pub captured_at: Instant,
}

/// Per-kind cache of conclusive probe results.
///
/// Only conclusive results are ever stored; inconclusive outcomes bypass
/// the cache entirely so a transient failure is never persisted as a denial.
#[derive(Debug)]
pub(crate) struct ProbeCache {
    ttl: Duration,
    entries: HashMap<CapabilityKind, CacheEntry>,
}

impl ProbeCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Cached grant state and its age, if younger than the TTL.
    pub fn get(&self, kind: CapabilityKind) -> Option<(bool, Duration)> {
        let entry = self.entries.get(&kind)?;
        let age = entry.captured_at.elapsed();
        (age < self.ttl).then_some((entry.granted, age))
    }

    pub fn set(&mut self, kind: CapabilityKind, granted: bool) {
        self.entries.insert(
            kind,
            CacheEntry {
                granted,
                captured_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&mut self, kind: CapabilityKind) {
        self.entries.remove(&kind);
    }

    pub fn clear(&mut self) {
        for kind in CapabilityKind::ALL {
            self.invalidate(kind);
        }
    }
}
