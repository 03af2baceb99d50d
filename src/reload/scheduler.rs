//! Debounced reload scheduling.
//!
//! # Data Flow
//! ```text
//! watcher callback → SchedulerHandle::file_changed → actor
//!     filter → state machine → (timer) → rebuild task → RebuildFinished → actor
//!     success → LifecycleHandle::restart()
//! ```
//!
//! # Design Decisions
//! - One actor task owns the state machine; the phase is published on a watch channel
//! - The rebuild runs in its own task so the actor keeps draining change events
//! - Changes that arrive while a rebuild is in flight are dropped, not queued

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use crate::config::ReloadConfig;
use crate::http::dispatcher::panic_message;
use crate::lifecycle::LifecycleHandle;
use crate::reload::build::{BuildError, BuildOutput, BuildRunner};
use crate::reload::filter::ReloadFilter;

/// Externally visible scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReloadPhase {
    Idle,
    Pending,
    Reloading,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Pending { deadline: Instant },
    Reloading,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// Timer (re)armed to fire at the given instant.
    Armed(Instant),
    /// A rebuild is in flight; the change is discarded.
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    StartRebuild,
    Skipped,
}

/// Idle / Pending / Reloading, with no I/O.
///
/// At most one rebuild is in flight, and only the last change in a burst
/// determines when the rebuild starts.
#[derive(Debug, Clone)]
pub struct ReloadStateMachine {
    debounce: Duration,
    state: State,
}

impl ReloadStateMachine {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            state: State::Idle,
        }
    }

    pub fn phase(&self) -> ReloadPhase {
        match self.state {
            State::Idle => ReloadPhase::Idle,
            State::Pending { .. } => ReloadPhase::Pending,
            State::Reloading => ReloadPhase::Reloading,
        }
    }

    /// When the pending timer fires, if one is armed.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            State::Pending { deadline } => Some(deadline),
            _ => None,
        }
    }

    pub fn on_change(&mut self, now: Instant) -> ChangeOutcome {
        match self.state {
            // TODO: decide whether a change landing mid-rebuild should queue one
            // follow-up rebuild instead of being lost.
            State::Reloading => ChangeOutcome::Dropped,
            State::Idle | State::Pending { .. } => {
                let deadline = now + self.debounce;
                self.state = State::Pending { deadline };
                ChangeOutcome::Armed(deadline)
            }
        }
    }

    pub fn on_timer(&mut self) -> FireOutcome {
        match self.state {
            State::Pending { .. } => {
                self.state = State::Reloading;
                FireOutcome::StartRebuild
            }
            State::Idle | State::Reloading => FireOutcome::Skipped,
        }
    }

    pub fn on_rebuild_finished(&mut self) {
        if self.state == State::Reloading {
            self.state = State::Idle;
        }
    }

    pub fn reset(&mut self) {
        self.state = State::Idle;
    }
}

enum SchedulerEvent {
    Changed(String),
    RebuildFinished(Result<BuildOutput, BuildError>),
}

/// Feeds file change notifications to the scheduler actor.
#[derive(Clone)]
pub struct SchedulerHandle {
    events: mpsc::UnboundedSender<SchedulerEvent>,
}

impl SchedulerHandle {
    /// Report a change to `name` (relative to the watched directory).
    pub fn file_changed(&self, name: impl Into<String>) {
        // Closed only once the actor has shut down; late callbacks are moot.
        let _ = self.events.send(SchedulerEvent::Changed(name.into()));
    }
}

/// Owner's side of a spawned scheduler.
pub struct RunningScheduler {
    handle: SchedulerHandle,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl RunningScheduler {
    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// Cancel any pending timer and stop the actor. An in-flight rebuild
    /// subprocess is left to finish; its result is discarded.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Reload scheduler task failed");
        }
    }
}

pub struct ReloadScheduler {
    machine: ReloadStateMachine,
    filter: ReloadFilter,
    runner: Arc<dyn BuildRunner>,
    lifecycle: LifecycleHandle,
    phase: Arc<watch::Sender<ReloadPhase>>,
    events_tx: mpsc::UnboundedSender<SchedulerEvent>,
    events_rx: mpsc::UnboundedReceiver<SchedulerEvent>,
    shutdown_rx: oneshot::Receiver<()>,
}

enum Step {
    Event(SchedulerEvent),
    TimerFired,
    Shutdown,
}

impl ReloadScheduler {
    /// Spawn the actor. Phase changes are published on `phase`.
    pub fn spawn(
        config: &ReloadConfig,
        runner: Arc<dyn BuildRunner>,
        lifecycle: LifecycleHandle,
        phase: Arc<watch::Sender<ReloadPhase>>,
    ) -> RunningScheduler {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let scheduler = Self {
            machine: ReloadStateMachine::new(Duration::from_millis(config.debounce_ms)),
            filter: ReloadFilter::from_config(config),
            runner,
            lifecycle,
            phase,
            events_tx: events_tx.clone(),
            events_rx,
            shutdown_rx,
        };
        scheduler.publish();

        RunningScheduler {
            handle: SchedulerHandle { events: events_tx },
            shutdown: shutdown_tx,
            task: tokio::spawn(scheduler.run()),
        }
    }

    async fn run(mut self) {
        loop {
            let deadline = self.machine.deadline();
            let step = tokio::select! {
                _ = &mut self.shutdown_rx => Step::Shutdown,
                event = self.events_rx.recv() => match event {
                    Some(event) => Step::Event(event),
                    None => Step::Shutdown,
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    Step::TimerFired
                }
            };

            match step {
                Step::Event(SchedulerEvent::Changed(name)) => self.on_file_changed(&name),
                Step::Event(SchedulerEvent::RebuildFinished(result)) => {
                    self.on_rebuild_finished(result)
                }
                Step::TimerFired => self.on_timer(),
                Step::Shutdown => break,
            }
        }

        self.machine.reset();
        self.publish();
        tracing::debug!("Reload scheduler stopped");
    }

    fn on_file_changed(&mut self, name: &str) {
        if !self.filter.should_reload(name) {
            tracing::trace!(file = name, "Ignoring change");
            return;
        }

        match self.machine.on_change(Instant::now()) {
            ChangeOutcome::Armed(_) => {
                tracing::debug!(file = name, "File changed, reload scheduled");
                self.publish();
            }
            ChangeOutcome::Dropped => {
                tracing::info!(file = name, "Reload already in progress, skipping change");
            }
        }
    }

    fn on_timer(&mut self) {
        match self.machine.on_timer() {
            FireOutcome::StartRebuild => {
                self.publish();
                tracing::info!("Hot reload triggered, rebuilding");
                self.spawn_rebuild();
            }
            FireOutcome::Skipped => {
                tracing::info!("Reload already in progress, skipping trigger");
            }
        }
    }

    fn spawn_rebuild(&self) {
        let runner = self.runner.clone();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let result = AssertUnwindSafe(runner.run())
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(BuildError::Panicked(panic_message(panic.as_ref()))));
            if events.send(SchedulerEvent::RebuildFinished(result)).is_err() {
                tracing::debug!("Scheduler stopped before rebuild finished");
            }
        });
    }

    fn on_rebuild_finished(&mut self, result: Result<BuildOutput, BuildError>) {
        match result {
            Ok(output) => {
                tracing::info!(stdout = %output.stdout.trim_end(), "Project rebuilt");
                match self.lifecycle.restart() {
                    Ok(()) => tracing::info!("Hot reload completed, restart requested"),
                    Err(e) => tracing::warn!(error = %e, "Rebuilt, but no server to restart"),
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Rebuild failed, keeping current server");
            }
        }

        self.machine.on_rebuild_finished();
        self.publish();
    }

    fn publish(&self) {
        self.phase.send_replace(self.machine.phase());
    }
}
