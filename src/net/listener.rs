//! TCP listener binding.
//!
//! # Responsibilities
//! - Resolve the configured host/port
//! - Bind the listening socket owned by the lifecycle controller
//! - Report bind failures without retrying

use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::config::ListenerConfig;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Host/port did not resolve to any address.
    Resolve(String, std::io::Error),
    /// Failed to bind to address.
    Bind(SocketAddr, std::io::Error),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Resolve(addr, e) => write!(f, "Failed to resolve {}: {}", addr, e),
            ListenerError::Bind(addr, e) => write!(f, "Failed to bind {}: {}", addr, e),
        }
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListenerError::Resolve(_, e) | ListenerError::Bind(_, e) => Some(e),
        }
    }
}

/// Bind a TCP listener to the configured host and port.
///
/// Hostnames are resolved and the first address that binds wins.
pub async fn bind(config: &ListenerConfig) -> Result<TcpListener, ListenerError> {
    let address = config.bind_address();
    let candidates: Vec<SocketAddr> = tokio::net::lookup_host(&address)
        .await
        .map_err(|e| ListenerError::Resolve(address.clone(), e))?
        .collect();

    let mut last_error = None;
    for addr in candidates {
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                let local_addr = listener.local_addr().map_err(|e| ListenerError::Bind(addr, e))?;
                tracing::info!(address = %local_addr, "Listener bound");
                return Ok(listener);
            }
            Err(e) => {
                tracing::debug!(address = %addr, error = %e, "Bind attempt failed");
                last_error = Some(ListenerError::Bind(addr, e));
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        ListenerError::Resolve(
            address,
            std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses"),
        )
    }))
}
