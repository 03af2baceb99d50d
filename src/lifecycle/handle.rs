//! Handles given out by the lifecycle controller.
//!
//! `ServerHandle` describes the socket of the current run. `LifecycleHandle` is
//! the capability plugins use to ask the controller for a restart or stop; it
//! only holds the sending half of the controller's command queue, so dropping
//! the controller never depends on plugins letting go.

use std::net::SocketAddr;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use thiserror::Error;
use tokio::sync::mpsc;

/// Read-only description of the listening socket for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    generation: u64,
}

impl ServerHandle {
    pub fn new(local_addr: SocketAddr, generation: u64) -> Self {
        Self {
            local_addr,
            generation,
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Incremented on every successful run; distinguishes restarts.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Requests a plugin can make of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleCommand {
    Restart,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("lifecycle controller is gone")]
    ControllerGone,
}

/// Cheap-to-clone capability for controlling the host from a plugin.
#[derive(Clone)]
pub struct LifecycleHandle {
    commands: mpsc::UnboundedSender<LifecycleCommand>,
    current: Arc<ArcSwapOption<ServerHandle>>,
}

impl LifecycleHandle {
    pub(crate) fn new(
        commands: mpsc::UnboundedSender<LifecycleCommand>,
        current: Arc<ArcSwapOption<ServerHandle>>,
    ) -> Self {
        Self { commands, current }
    }

    /// A handle not attached to any controller; commands arrive on the returned
    /// receiver. Useful for embedding a setting elsewhere and for tests.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<LifecycleCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx, Arc::new(ArcSwapOption::empty())), rx)
    }

    /// Ask the controller to tear down and re-run.
    pub fn restart(&self) -> Result<(), LifecycleError> {
        self.send(LifecycleCommand::Restart)
    }

    /// Ask the controller to stop.
    pub fn stop(&self) -> Result<(), LifecycleError> {
        self.send(LifecycleCommand::Stop)
    }

    /// The socket of the current run, if the host is running.
    pub fn server(&self) -> Option<ServerHandle> {
        self.current.load_full().map(|handle| (*handle).clone())
    }

    fn send(&self, command: LifecycleCommand) -> Result<(), LifecycleError> {
        self.commands
            .send(command)
            .map_err(|_| LifecycleError::ControllerGone)
    }
}

impl std::fmt::Debug for LifecycleHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleHandle")
            .field("server", &self.server())
            .field("closed", &self.commands.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_reach_receiver() {
        let (handle, mut rx) = LifecycleHandle::channel();
        handle.restart().unwrap();
        handle.clone().stop().unwrap();

        assert_eq!(rx.try_recv().unwrap(), LifecycleCommand::Restart);
        assert_eq!(rx.try_recv().unwrap(), LifecycleCommand::Stop);
    }

    #[test]
    fn dropped_receiver_reports_controller_gone() {
        let (handle, rx) = LifecycleHandle::channel();
        drop(rx);
        assert_eq!(handle.restart(), Err(LifecycleError::ControllerGone));
    }

    #[test]
    fn server_reflects_shared_slot() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let slot = Arc::new(ArcSwapOption::empty());
        let handle = LifecycleHandle::new(tx, slot.clone());
        assert!(handle.server().is_none());

        let server = ServerHandle::new("127.0.0.1:3000".parse().unwrap(), 1);
        slot.store(Some(Arc::new(server.clone())));
        assert_eq!(handle.server(), Some(server));
    }
}
