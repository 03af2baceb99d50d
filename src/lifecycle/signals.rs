//! OS signal handling.
//!
//! # Responsibilities
//! - Listen for SIGINT (Ctrl+C everywhere) and SIGTERM (Unix)
//! - Translate the first one into a `Stop` request on the lifecycle handle
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGTERM is registered before returning, so a signal arriving right after
//!   `run()` is never handled by the default disposition
//! - Installed once per controller, not once per run

use crate::lifecycle::handle::LifecycleHandle;

/// Register the termination handlers and spawn a task that requests a stop
/// on the first signal.
pub fn forward_termination(handle: LifecycleHandle) -> std::io::Result<()> {
    #[cfg(unix)]
    let mut term = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::spawn(async move {
        #[cfg(unix)]
        let received = tokio::select! {
            result = tokio::signal::ctrl_c() => result,
            _ = term.recv() => Ok(()),
        };

        #[cfg(not(unix))]
        let received = tokio::signal::ctrl_c().await;

        match received {
            Ok(()) => {
                tracing::info!("Shutdown signal received");
                if let Err(e) = handle.stop() {
                    tracing::warn!(error = %e, "Could not deliver stop request");
                }
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C"),
        }
    });

    Ok(())
}
