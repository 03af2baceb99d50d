//! Long-running development child process (e.g. a bundler in watch mode).
//!
//! # Design Decisions
//! - A supervisor task owns the `Child`; the handle only holds signals into it
//! - Stop is graceful first (SIGTERM), then a forced kill after the timeout
//! - Dropping the handle kills the child

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::{oneshot, watch};

pub struct DevProcess {
    command: String,
    pid: Option<u32>,
    running: Arc<AtomicBool>,
    exited: watch::Receiver<bool>,
    kill: Option<oneshot::Sender<()>>,
}

impl DevProcess {
    /// Spawn `argv`, inheriting stdout/stderr.
    pub fn spawn(argv: &[String]) -> std::io::Result<Self> {
        let Some((program, args)) = argv.split_first() else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "dev command is empty",
            ));
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()?;

        let command = argv.join(" ");
        let pid = child.id();
        let running = Arc::new(AtomicBool::new(true));
        let (exited_tx, exited) = watch::channel(false);
        let (kill, kill_rx) = oneshot::channel::<()>();

        tracing::info!(command = %command, pid = ?pid, "Dev process started");

        let flag = running.clone();
        let name = command.clone();
        tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => match status {
                    Ok(status) => tracing::info!(command = %name, %status, "Dev process exited"),
                    Err(e) => tracing::warn!(command = %name, error = %e, "Failed to wait for dev process"),
                },
                _ = kill_rx => {
                    if let Err(e) = child.start_kill() {
                        tracing::warn!(command = %name, error = %e, "Failed to kill dev process");
                    }
                    let _ = child.wait().await;
                }
            }
            flag.store(false, Ordering::SeqCst);
            let _ = exited_tx.send(true);
        });

        Ok(Self {
            command,
            pid,
            running,
            exited,
            kill: Some(kill),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Ask the process to terminate, escalating to a kill if it has not
    /// exited within `timeout`. Returns once exit is observed or the kill has
    /// been issued.
    pub async fn stop(mut self, timeout: Duration) {
        if !self.is_running() {
            return;
        }

        tracing::info!(command = %self.command, "Stopping dev process");

        if self.pid.is_some_and(request_termination) {
            let mut exited = self.exited.clone();
            if tokio::time::timeout(timeout, exited.wait_for(|done| *done))
                .await
                .is_ok()
            {
                tracing::info!(command = %self.command, "Dev process stopped");
                return;
            }
            tracing::warn!(command = %self.command, "Dev process ignored SIGTERM, force killing");
        }

        if let Some(kill) = self.kill.take() {
            let _ = kill.send(());
        }
    }
}

#[cfg(unix)]
fn request_termination(pid: u32) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(pid, error = %e, "Failed to send SIGTERM to dev process");
            false
        }
    }
}

// No polite termination request elsewhere; go straight to the kill.
#[cfg(not(unix))]
fn request_termination(_pid: u32) -> bool {
    false
}
