//! Single-page-application host library.
//!
//! An ordered middleware chain behind an HTTP socket, a lifecycle controller
//! with run/stop/restart, and server settings (plugins) such as hot reload.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod middleware;
pub mod net;
pub mod observability;
pub mod reload;

pub use config::schema::HostConfig;
pub use http::{Dispatcher, HostRequest, HttpServer, ResponseWriter};
pub use lifecycle::{HostServer, LifecycleHandle, ServerHandle, ServerSetting};
pub use middleware::{Middleware, MiddlewareError, StaticFiles};
pub use reload::{HotReload, ReloadStatus};
