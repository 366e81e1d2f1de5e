//! CLI error types.

use thiserror::Error;

use crate::config::ConfigError;

/// CLI errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The configuration file could not be read or parsed.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A capability name given on the command line is not known.
    #[error(transparent)]
    Capability(#[from] capability::Error),

    /// An error occurred in the monitor.
    #[error(transparent)]
    Monitor(#[from] monitor::Error),

    /// Failed to render JSON output.
    #[error("failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
