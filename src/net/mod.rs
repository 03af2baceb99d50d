//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ListenerConfig (host, port)
//!     → listener.rs (resolve, bind)
//!     → TcpListener handed to the HTTP serve task
//!     → closed by the lifecycle controller on stop/restart
//! ```
//!
//! # Design Decisions
//! - Exactly one listener per running host
//! - Bind errors surface to the caller; no automatic retry

pub mod listener;

pub use listener::{bind, ListenerError};
