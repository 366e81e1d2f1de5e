//! Registry error types.

use thiserror::Error;

/// Registry errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A capability name did not match any known kind.
    #[error("unknown capability: {0}")]
    UnknownCapability(String),
}

pub type Result<T> = std::result::Result<T, Error>;
