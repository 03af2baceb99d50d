//! Hot reload subsystem.
//!
//! # Data Flow
//! ```text
//! initialize (mod.rs):
//!     Spawn scheduler → Watch each existing path (watcher.rs) → Spawn dev process
//!
//! Change (watcher.rs → scheduler.rs):
//!     Relative name → Filter (filter.rs) → Debounce → Rebuild (build.rs) → Restart request
//!
//! cleanup (mod.rs):
//!     Cancel timer → Stop dev process (dev_process.rs) → Close watchers
//! ```

pub mod build;
pub mod dev_process;
pub mod filter;
pub mod scheduler;
pub mod watcher;

pub use build::{BuildError, BuildOutput, BuildRunner, CommandRunner};
pub use dev_process::DevProcess;
pub use filter::ReloadFilter;
pub use scheduler::{ReloadPhase, ReloadScheduler, ReloadStateMachine, SchedulerHandle};
pub use watcher::PathWatcher;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::watch;

use crate::config::ReloadConfig;
use crate::lifecycle::{LifecycleHandle, ServerHandle, ServerSetting, SettingError};
use scheduler::RunningScheduler;

/// Snapshot reported by [`HotReload::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadStatus {
    pub enabled: bool,
    pub watching_paths: Vec<PathBuf>,
    pub active_watchers: usize,
    pub dev_process_running: bool,
    pub is_reloading: bool,
    pub phase: ReloadPhase,
}

struct WatchSession {
    scheduler: RunningScheduler,
    watchers: Vec<PathWatcher>,
    dev: Option<DevProcess>,
}

impl WatchSession {
    async fn close(self, dev_stop_timeout: Duration) {
        self.scheduler.shutdown().await;
        if let Some(dev) = self.dev {
            dev.stop(dev_stop_timeout).await;
        }
        for watcher in self.watchers {
            watcher.close();
        }
    }
}

/// Server setting that rebuilds and restarts the host when sources change.
pub struct HotReload {
    config: ReloadConfig,
    runner: Arc<dyn BuildRunner>,
    phase: Arc<watch::Sender<ReloadPhase>>,
    session: Mutex<Option<WatchSession>>,
}

impl HotReload {
    /// Rebuild with the configured build command.
    pub fn new(config: ReloadConfig) -> Self {
        let runner = Arc::new(CommandRunner::new(config.build_command.clone()));
        Self::with_runner(config, runner)
    }

    pub fn with_runner(config: ReloadConfig, runner: Arc<dyn BuildRunner>) -> Self {
        Self {
            config,
            runner,
            phase: Arc::new(watch::channel(ReloadPhase::Idle).0),
            session: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ReloadConfig {
        &self.config
    }

    pub fn should_reload(&self, file_name: &str) -> bool {
        ReloadFilter::from_config(&self.config).should_reload(file_name)
    }

    pub fn phase(&self) -> ReloadPhase {
        *self.phase.borrow()
    }

    pub fn status(&self) -> ReloadStatus {
        let session = self.session();
        let phase = self.phase();
        ReloadStatus {
            enabled: self.config.enabled,
            watching_paths: self
                .config
                .watch_paths
                .iter()
                .filter(|path| path.exists())
                .cloned()
                .collect(),
            active_watchers: session.as_ref().map_or(0, |s| s.watchers.len()),
            dev_process_running: session
                .as_ref()
                .and_then(|s| s.dev.as_ref())
                .is_some_and(DevProcess::is_running),
            is_reloading: phase == ReloadPhase::Reloading,
            phase,
        }
    }

    fn session(&self) -> MutexGuard<'_, Option<WatchSession>> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn dev_stop_timeout(&self) -> Duration {
        Duration::from_millis(self.config.dev_stop_timeout_ms)
    }
}

#[async_trait]
impl ServerSetting for HotReload {
    fn name(&self) -> &str {
        "hot_reload"
    }

    async fn initialize(
        &self,
        _server: ServerHandle,
        lifecycle: LifecycleHandle,
    ) -> Result<(), SettingError> {
        if !self.config.enabled {
            tracing::info!("Hot reload disabled");
            return Ok(());
        }

        let previous = self.session().take();
        if let Some(previous) = previous {
            tracing::warn!("Hot reload initialized twice without cleanup, closing previous watchers");
            previous.close(self.dev_stop_timeout()).await;
        }

        let scheduler =
            ReloadScheduler::spawn(&self.config, self.runner.clone(), lifecycle, self.phase.clone());

        let mut watchers = Vec::new();
        for path in &self.config.watch_paths {
            if !path.exists() {
                tracing::debug!(path = ?path, "Watch path does not exist, skipping");
                continue;
            }
            match PathWatcher::start(path, scheduler.handle()) {
                Ok(watcher) => watchers.push(watcher),
                Err(e) => tracing::warn!(path = ?path, error = %e, "Failed to watch path"),
            }
        }

        let dev = match &self.config.dev_command {
            Some(argv) => match DevProcess::spawn(argv) {
                Ok(process) => Some(process),
                Err(e) => {
                    tracing::error!(command = %argv.join(" "), error = %e, "Failed to start dev process");
                    None
                }
            },
            None => None,
        };

        tracing::info!(
            watchers = watchers.len(),
            debounce_ms = self.config.debounce_ms,
            dev_process = dev.is_some(),
            "Hot reload active"
        );

        *self.session() = Some(WatchSession {
            scheduler,
            watchers,
            dev,
        });
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), SettingError> {
        let session = self.session().take();
        let Some(session) = session else {
            return Ok(());
        };

        session.close(self.dev_stop_timeout()).await;
        tracing::info!("Hot reload cleaned up");
        Ok(())
    }
}
