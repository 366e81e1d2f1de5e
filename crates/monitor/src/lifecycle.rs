//! Reference-counted activation of the background poll.

use std::time::Duration;

use tokio::sync::mpsc::WeakUnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::monitor::Command;

/// Registration counter and the poll task it controls.
///
/// Invariant: `poll` is `Some` exactly when `registrations > 0`.
pub(crate) struct Lifecycle {
    registrations: usize,
    interval: Duration,
    poll: Option<JoinHandle<()>>,
}

impl Lifecycle {
    pub fn new(interval: Duration) -> Self {
        Self {
            registrations: 0,
            interval,
            poll: None,
        }
    }

    pub fn registrations(&self) -> usize {
        self.registrations
    }

    pub fn is_polling(&self) -> bool {
        self.poll.is_some()
    }

    /// Count one more observer. Returns `true` on the idle-to-active
    /// transition, after the poll task has been started.
    pub fn register(&mut self, commands: &WeakUnboundedSender<Command>) -> bool {
        self.registrations += 1;
        debug!(count = self.registrations, "registered for monitoring");

        if self.registrations != 1 {
            return false;
        }

        info!(interval = ?self.interval, "starting permission monitoring");
        self.poll = Some(tokio::spawn(poll(commands.clone(), self.interval)));
        true
    }

    /// Drop one observer, never going below zero. Returns `true` on the
    /// active-to-idle transition, after the poll task has been stopped.
    pub fn unregister(&mut self) -> bool {
        let was_active = self.registrations > 0;
        self.registrations = self.registrations.saturating_sub(1);
        debug!(count = self.registrations, "unregistered from monitoring");

        if !was_active || self.registrations != 0 {
            return false;
        }

        info!("stopping permission monitoring");
        self.stop();
        true
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.poll.take() {
            task.abort();
        }
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Post a tick to the coordinating task every `period` until it goes away.
async fn poll(commands: WeakUnboundedSender<Command>, period: Duration) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let Some(commands) = commands.upgrade() else {
            break;
        };
        if commands.send(Command::Tick).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn polls_only_while_registered() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut lifecycle = Lifecycle::new(Duration::from_secs(1));

        assert!(lifecycle.register(&tx.downgrade()));
        assert!(!lifecycle.register(&tx.downgrade()));
        assert!(lifecycle.is_polling());

        time::sleep(Duration::from_millis(1500)).await;
        assert!(matches!(rx.try_recv(), Ok(Command::Tick)));

        assert!(!lifecycle.unregister());
        assert!(lifecycle.is_polling());
        assert!(lifecycle.unregister());
        assert!(!lifecycle.is_polling());

        time::sleep(Duration::from_secs(3)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unregister_floors_at_zero() {
        let mut lifecycle = Lifecycle::new(Duration::from_secs(1));

        assert!(!lifecycle.unregister());
        assert_eq!(lifecycle.registrations(), 0);
        assert!(!lifecycle.is_polling());
    }
}
