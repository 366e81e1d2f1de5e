//! Change notification broadcast.

use tokio::sync::broadcast;

/// Emitted once per grant map change. Carries no payload; observers
/// re-query the monitor after receiving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrantsChanged;

/// Capacity of the broadcast ring. Slow observers that lag behind only miss
/// duplicate "something changed" signals.
const CAPACITY: usize = 16;

#[derive(Debug, Clone)]
pub(crate) struct NotificationBus {
    tx: broadcast::Sender<GrantsChanged>,
}

impl NotificationBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GrantsChanged> {
        self.tx.subscribe()
    }

    /// Publish one change event; returns how many observers received it.
    pub fn publish(&self) -> usize {
        // No subscribers is not an error for a broadcast signal.
        self.tx.send(GrantsChanged).unwrap_or(0)
    }
}
