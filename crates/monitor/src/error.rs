use std::time::Duration;

use thiserror::Error;

/// Monitor and platform primitive errors.
///
/// Probe errors never reach grant queries; they are folded into "not
/// granted" by the probe strategies. `Timeout` and `Cancelled` are the
/// inconclusive class and are never cached.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("operation cancelled")]
    Cancelled,

    #[error("denied: {0}")]
    Denied(String),

    #[error("not supported on this platform: {0}")]
    Unsupported(String),

    #[error("platform error: {0}")]
    Platform(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("monitor has shut down")]
    Closed,
}

impl Error {
    /// Whether this error leaves the grant state undecided rather than denied.
    pub fn is_inconclusive(&self) -> bool {
        matches!(self, Error::Timeout(_) | Error::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
