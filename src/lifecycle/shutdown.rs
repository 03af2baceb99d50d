//! Shutdown coordination for one run of the HTTP server.

use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::http::HttpServer;
use crate::lifecycle::handle::ServerHandle;

/// A serve task plus the broadcast channel that tells it to close its socket.
pub(crate) struct RunningServer {
    handle: ServerHandle,
    tx: broadcast::Sender<()>,
    task: JoinHandle<Result<(), std::io::Error>>,
}

impl RunningServer {
    /// Move `listener` into a new serve task.
    pub(crate) fn spawn(handle: ServerHandle, server: HttpServer, listener: TcpListener) -> Self {
        let (tx, rx) = broadcast::channel(1);
        let addr = handle.local_addr();
        let task = tokio::spawn(async move {
            let result = server.run(listener, rx).await;
            if let Err(e) = &result {
                // Accepted connections are unaffected; the controller decides what's next.
                tracing::error!(address = %addr, error = %e, "HTTP server error");
            }
            result
        });

        Self { handle, tx, task }
    }

    pub(crate) fn handle(&self) -> &ServerHandle {
        &self.handle
    }

    /// Stop accepting, drain in-flight connections for at most `drain_timeout`,
    /// then abort. The listener is released when this returns.
    pub(crate) async fn close(self, drain_timeout: Duration) {
        let Self { handle, tx, mut task } = self;
        // No receiver means the serve task already exited.
        let _ = tx.send(());

        match tokio::time::timeout(drain_timeout, &mut task).await {
            Ok(Ok(_)) => {
                tracing::debug!(address = %handle.local_addr(), "Listener closed");
            }
            Ok(Err(e)) => {
                tracing::error!(address = %handle.local_addr(), error = %e, "Serve task failed");
            }
            Err(_) => {
                tracing::warn!(
                    address = %handle.local_addr(),
                    timeout_ms = drain_timeout.as_millis() as u64,
                    "Drain deadline exceeded, aborting serve task"
                );
                task.abort();
                let _ = task.await;
            }
        }
    }
}
