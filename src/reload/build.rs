//! Rebuild step run before a hot restart.

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

/// Captured output of a successful build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to spawn build command `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("build exited with code {code:?}: {stderr}")]
    Failed {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("build runner panicked: {0}")]
    Panicked(String),
}

/// Something that can rebuild the project.
#[async_trait]
pub trait BuildRunner: Send + Sync {
    async fn run(&self) -> Result<BuildOutput, BuildError>;
}

/// Runs the configured build command as a subprocess and waits for it.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    argv: Vec<String>,
}

impl CommandRunner {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }

    pub fn display(&self) -> String {
        self.argv.join(" ")
    }

    fn command(&self) -> Command {
        // On Windows package-manager shims are .cmd files, so go through the shell.
        #[cfg(windows)]
        let mut command = {
            let mut c = Command::new("cmd");
            c.arg("/C").args(&self.argv);
            c
        };

        #[cfg(not(windows))]
        let mut command = {
            let (program, args) = match self.argv.split_first() {
                Some((program, args)) => (program.as_str(), args),
                None => ("", &[][..]),
            };
            let mut c = Command::new(program);
            c.args(args);
            c
        };

        command.stdin(std::process::Stdio::null());
        command
    }
}

#[async_trait]
impl BuildRunner for CommandRunner {
    async fn run(&self) -> Result<BuildOutput, BuildError> {
        tracing::debug!(command = %self.display(), "Running build");

        let output = self
            .command()
            .output()
            .await
            .map_err(|source| BuildError::Spawn {
                command: self.display(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            Ok(BuildOutput {
                code: output.status.code(),
                stdout,
                stderr,
            })
        } else {
            Err(BuildError::Failed {
                code: output.status.code(),
                stdout,
                stderr,
            })
        }
    }
}
