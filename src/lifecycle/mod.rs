//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Run (controller.rs):
//!     Bind listener → Spawn serve task → Publish ServerHandle → Initialize settings
//!
//! Stop (controller.rs + shutdown.rs):
//!     Signal serve task → Stop accepting → Drain (bounded) → Cleanup settings
//!
//! Restart:
//!     Stop socket → Cleanup settings → Grace delay → Run
//!
//! Requests from plugins (handle.rs):
//!     LifecycleHandle::restart()/stop() → command queue → controller, one at a time
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Stop request
//! ```
//!
//! # Design Decisions
//! - The controller alone owns the socket; plugins get a description and a handle
//! - Plugin failures are isolated per plugin and never abort a lifecycle step
//! - Shutdown has timeout: serve task aborted after the drain deadline

pub mod controller;
pub mod handle;
pub mod setting;
pub(crate) mod shutdown;
pub mod signals;

pub use controller::{HostServer, ServerError};
pub use handle::{LifecycleCommand, LifecycleError, LifecycleHandle, ServerHandle};
pub use setting::{ServerSetting, SettingError};
