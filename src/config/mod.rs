//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → HostConfig (validated, immutable)
//!     → CLI flags override individual fields (main.rs)
//!     → passed by value into the lifecycle controller and plugins
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; no process-wide mutable host/port
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::HostConfig;
pub use schema::HttpConfig;
pub use schema::LifecycleConfig;
pub use schema::ListenerConfig;
pub use schema::LogFormat;
pub use schema::ObservabilityConfig;
pub use schema::ReloadConfig;
pub use schema::StaticFilesConfig;
