//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, trace)
//!     → request.rs (buffer into HostRequest)
//!     → dispatcher.rs (ordered middleware chain)
//!     → response.rs (ResponseWriter → HTTP response)
//!     → Send to client
//! ```

pub mod dispatcher;
pub mod request;
pub mod response;
pub mod server;

pub use dispatcher::Dispatcher;
pub use request::{HostRequest, RequestIdGenerator, X_REQUEST_ID};
pub use response::{ResponseError, ResponseState, ResponseWriter};
pub use server::HttpServer;
