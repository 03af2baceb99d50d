//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (structured fields, request ID where known)
//!
//! Consumers:
//!     → logging.rs subscriber → stdout (pretty or JSON)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through the HTTP layer via tower-http

pub mod logging;

pub use logging::init_logging;
