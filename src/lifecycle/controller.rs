//! The lifecycle controller.
//!
//! # Responsibilities
//! - Own the listening socket (via the serve task) and the plugin list
//! - run / stop / restart, driving plugin initialize and cleanup
//! - Process restart/stop requests coming in through `LifecycleHandle`s
//!
//! # State machine
//! ```text
//! Stopped --run--> Running --stop--> Stopped
//! Running --restart--> (close socket, cleanup, grace delay, run) --> Running
//! Stopped --restart--> run
//! ```
//!
//! Controller state lives behind an async mutex shared by the public methods
//! and the command task started on the first `run()`, so requests from
//! handles and signals are honored whether or not `serve()` is used.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use futures_util::FutureExt;
use thiserror::Error;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

use crate::config::{HostConfig, HttpConfig, LifecycleConfig, ListenerConfig};
use crate::http::dispatcher::panic_message;
use crate::http::{Dispatcher, HttpServer};
use crate::lifecycle::handle::{LifecycleCommand, LifecycleHandle, ServerHandle};
use crate::lifecycle::setting::ServerSetting;
use crate::lifecycle::shutdown::RunningServer;
use crate::lifecycle::signals;
use crate::middleware::Middleware;
use crate::net::{self, ListenerError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Bind(#[from] ListenerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Hosts the dispatcher on a TCP socket and drives the plugins.
pub struct HostServer {
    controller: Arc<Mutex<Controller>>,
    current: Arc<ArcSwapOption<ServerHandle>>,
    commands_tx: mpsc::UnboundedSender<LifecycleCommand>,
    commands_rx: Option<mpsc::UnboundedReceiver<LifecycleCommand>>,
    command_task: Option<JoinHandle<()>>,
    stopped: watch::Receiver<u64>,
    handle_signals: bool,
    signals_installed: bool,
}

struct Controller {
    listener: ListenerConfig,
    http: HttpConfig,
    timing: LifecycleConfig,
    dispatcher: Arc<Dispatcher>,
    settings: Vec<Arc<dyn ServerSetting>>,
    running: Option<RunningServer>,
    current: Arc<ArcSwapOption<ServerHandle>>,
    lifecycle: LifecycleHandle,
    generation: u64,
    // Bumped after every completed stop.
    stops: watch::Sender<u64>,
}

impl HostServer {
    /// Create a stopped host. Middleware run in the given order; settings are
    /// initialized and cleaned up in the given order.
    pub fn new(
        config: &HostConfig,
        middleware: Vec<Arc<dyn Middleware>>,
        settings: Vec<Arc<dyn ServerSetting>>,
    ) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let current = Arc::new(ArcSwapOption::empty());
        let (stops, stopped) = watch::channel(0);

        let controller = Controller {
            listener: config.listener.clone(),
            http: config.http.clone(),
            timing: config.lifecycle.clone(),
            dispatcher: Arc::new(Dispatcher::new(middleware)),
            settings,
            running: None,
            current: current.clone(),
            lifecycle: LifecycleHandle::new(commands_tx.clone(), current.clone()),
            generation: 0,
            stops,
        };

        Self {
            controller: Arc::new(Mutex::new(controller)),
            current,
            commands_tx,
            commands_rx: Some(commands_rx),
            command_task: None,
            stopped,
            handle_signals: true,
            signals_installed: false,
        }
    }

    /// Whether SIGINT/SIGTERM should map to `stop` (default: true).
    pub fn with_signal_handling(mut self, enabled: bool) -> Self {
        self.handle_signals = enabled;
        self
    }

    /// A handle that can request restart/stop of this host.
    pub fn handle(&self) -> LifecycleHandle {
        LifecycleHandle::new(self.commands_tx.clone(), self.current.clone())
    }

    /// The current socket, if running.
    pub fn server_handle(&self) -> Option<ServerHandle> {
        self.current.load_full().map(|handle| (*handle).clone())
    }

    pub fn is_running(&self) -> bool {
        self.current.load().is_some()
    }

    /// Bind, start serving, and initialize every setting.
    ///
    /// Setting failures are logged and do not fail the run. The first call
    /// also starts processing handle requests and, unless disabled, installs
    /// the termination signal handler.
    pub async fn run(&mut self) -> Result<ServerHandle, ServerError> {
        self.start_command_task();
        let handle = self.controller.lock().await.run().await?;
        self.install_signals();
        Ok(handle)
    }

    /// Close the socket and clean up every setting.
    pub async fn stop(&mut self) {
        self.controller.lock().await.stop().await;
    }

    /// Tear down the current run (if any) and run again.
    ///
    /// With no open socket this is exactly `run()`.
    pub async fn restart(&mut self) -> Result<ServerHandle, ServerError> {
        self.start_command_task();
        let handle = self.controller.lock().await.restart().await?;
        self.install_signals();
        Ok(handle)
    }

    /// Run, then wait until a stop has been handled.
    pub async fn serve(mut self) -> Result<(), ServerError> {
        let mut stopped = self.stopped.clone();
        let _ = stopped.borrow_and_update();

        self.run().await?;

        // Err only if the controller is gone, which means it is not running either.
        let _ = stopped.changed().await;
        Ok(())
    }

    fn start_command_task(&mut self) {
        let Some(commands) = self.commands_rx.take() else {
            return;
        };
        let controller = self.controller.clone();
        self.command_task = Some(tokio::spawn(process_commands(controller, commands)));
    }

    fn install_signals(&mut self) {
        if !self.handle_signals || self.signals_installed {
            return;
        }
        match signals::forward_termination(self.handle()) {
            Ok(()) => self.signals_installed = true,
            Err(e) => tracing::error!(error = %e, "Failed to install signal handler"),
        }
    }
}

impl Drop for HostServer {
    fn drop(&mut self) {
        if let Some(task) = self.command_task.take() {
            task.abort();
        }
    }
}

async fn process_commands(
    controller: Arc<Mutex<Controller>>,
    mut commands: mpsc::UnboundedReceiver<LifecycleCommand>,
) {
    while let Some(command) = commands.recv().await {
        let mut controller = controller.lock().await;
        match command {
            LifecycleCommand::Restart => {
                if let Err(e) = controller.restart().await {
                    tracing::error!(error = %e, "Restart failed, host stays down until the next request");
                }
            }
            LifecycleCommand::Stop => controller.stop().await,
        }
    }
}

impl Controller {
    async fn run(&mut self) -> Result<ServerHandle, ServerError> {
        if let Some(running) = &self.running {
            tracing::warn!(address = %running.handle().local_addr(), "Host already running");
            return Ok(running.handle().clone());
        }

        let listener = match net::bind(&self.listener).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(error = %e, "Failed to open listening socket");
                return Err(e.into());
            }
        };
        let local_addr = listener.local_addr()?;

        self.generation += 1;
        let handle = ServerHandle::new(local_addr, self.generation);
        let server = HttpServer::new(self.dispatcher.clone(), &self.http);
        self.running = Some(RunningServer::spawn(handle.clone(), server, listener));
        self.current.store(Some(Arc::new(handle.clone())));

        tracing::info!(
            generation = handle.generation(),
            middleware = self.dispatcher.len(),
            settings = self.settings.len(),
            "Server running at http://{}/",
            local_addr
        );

        self.initialize_settings(&handle).await;
        Ok(handle)
    }

    async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            tracing::info!("Stop requested but host is not running");
            return;
        };

        self.close(running).await;
        self.cleanup_settings().await;
        self.stops.send_modify(|count| *count += 1);
        tracing::info!("Host stopped");
    }

    async fn restart(&mut self) -> Result<ServerHandle, ServerError> {
        if let Some(running) = self.running.take() {
            tracing::info!(address = %running.handle().local_addr(), "Restarting host");
            self.close(running).await;
            self.cleanup_settings().await;
            tokio::time::sleep(Duration::from_millis(self.timing.restart_grace_ms)).await;
        }
        self.run().await
    }

    async fn close(&mut self, running: RunningServer) {
        self.current.store(None);
        running
            .close(Duration::from_millis(self.timing.shutdown_timeout_ms))
            .await;
    }

    async fn initialize_settings(&self, handle: &ServerHandle) {
        for setting in &self.settings {
            let outcome = AssertUnwindSafe(setting.initialize(handle.clone(), self.lifecycle.clone()))
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(())) => tracing::debug!(setting = setting.name(), "Setting initialized"),
                Ok(Err(e)) => {
                    tracing::error!(setting = setting.name(), error = %e, "Setting failed to initialize")
                }
                Err(panic) => tracing::error!(
                    setting = setting.name(),
                    error = %panic_message(panic.as_ref()),
                    "Setting panicked during initialize"
                ),
            }
        }
    }

    async fn cleanup_settings(&self) {
        for setting in &self.settings {
            let outcome = AssertUnwindSafe(setting.cleanup()).catch_unwind().await;
            match outcome {
                Ok(Ok(())) => tracing::debug!(setting = setting.name(), "Setting cleaned up"),
                Ok(Err(e)) => {
                    tracing::error!(setting = setting.name(), error = %e, "Setting failed to clean up")
                }
                Err(panic) => tracing::error!(
                    setting = setting.name(),
                    error = %panic_message(panic.as_ref()),
                    "Setting panicked during cleanup"
                ),
            }
        }
    }
}
