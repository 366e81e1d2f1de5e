//! Capability authorization monitor.
//!
//! Tracks whether the OS capabilities the application depends on
//! (automation, screen capture, accessibility) are currently granted. Each
//! kind is verified by its own probe built on injected [`Platform`]
//! primitives; results feed one authoritative grant map, and observers are
//! told through a payload-free [`GrantsChanged`] broadcast whenever it
//! changes.
//!
//! # Overview
//!
//! - **Monitor**: cloneable handle to a coordinating task that owns all
//!   mutable state. Queries read the last applied snapshot and never block.
//! - **Registration**: observers call [`Monitor::register`] /
//!   [`Monitor::unregister`] (or hold a [`Registration`] guard); a 1 Hz
//!   background poll runs only while at least one is registered.
//! - **Probes**: automation runs a benign script; screen capture uses a
//!   cheap preflight then a bounded content enumeration behind a short TTL
//!   cache; accessibility confirms the trust API with a functional
//!   window-list probe.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use capability::CapabilityKind;
//! use monitor::Monitor;
//!
//! # async fn example(platform: Arc<impl monitor::Platform>) -> monitor::Result<()> {
//! let monitor = Monitor::builder(platform).spawn();
//! let mut changes = monitor.subscribe();
//! let _watching = monitor.watch();
//!
//! while changes.recv().await.is_ok() {
//!     println!("missing: {:?}", monitor.missing_capabilities());
//!     if monitor.all_granted() {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod bus;
mod cache;
mod config;
mod error;
mod lifecycle;
mod monitor;
mod platform;
mod probe;
mod state;

pub use bus::GrantsChanged;
pub use config::MonitorConfig;
pub use error::{Error, Result};
pub use monitor::{Monitor, MonitorBuilder, MonitorStatus, Registration};
pub use platform::{LogOpener, PermissionPrompt, Platform, Presenter, SettingsOpener};
pub use state::GrantMap;

pub use capability::{CapabilityKind, CapabilityMetadata};
