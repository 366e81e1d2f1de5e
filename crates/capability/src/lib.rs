//! Capability registry.
//!
//! Static description of every OS-level capability the application depends
//! on. Grant state lives in the `monitor` crate; this crate only knows what
//! each capability is called, why it is needed, and where the user can
//! grant it.

mod capability;
mod error;

pub use capability::{CapabilityKind, CapabilityMetadata};
pub use error::{Error, Result};
