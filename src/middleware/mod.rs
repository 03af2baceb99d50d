//! Request-processing middleware.
//!
//! # Data Flow
//! ```text
//! HostRequest + ResponseWriter
//!     → middleware[0].process()  (may answer, may pass through)
//!     → middleware[1].process()  (skipped once the response is finished)
//!     → ...
//! ```
//!
//! # Design Decisions
//! - A middleware that completes the response must not rely on later ones running
//! - Errors are returned, not panicked; the dispatcher maps them to a 500
//! - Middleware are shared (`Arc`) and must be `Send + Sync`

pub mod static_files;

use async_trait::async_trait;
use thiserror::Error;

use crate::http::{HostRequest, ResponseError, ResponseWriter};

pub use static_files::StaticFiles;

/// Failure raised while processing a request.
#[derive(Debug, Error)]
pub enum MiddlewareError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("response error: {0}")]
    Response(#[from] ResponseError),

    #[error("{0}")]
    Message(String),
}

impl MiddlewareError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

/// A unit of request processing.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Inspect the request and optionally write to or complete the response.
    async fn process(
        &self,
        request: &HostRequest,
        response: &mut ResponseWriter,
    ) -> Result<(), MiddlewareError>;
}
