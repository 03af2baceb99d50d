//! Plugin contract.
//!
//! A setting is attached to the host lifecycle: `initialize` runs after every
//! successful bind (initial run and each restart), `cleanup` runs on stop and
//! before a restart rebinds. Both receive no ownership of the socket.

use async_trait::async_trait;
use thiserror::Error;

use crate::lifecycle::handle::{LifecycleHandle, ServerHandle};

/// Failure raised by a setting hook. Logged by the controller, never propagated.
#[derive(Debug, Error)]
pub enum SettingError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Message(String),
}

impl SettingError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

#[async_trait]
pub trait ServerSetting: Send + Sync {
    /// Display name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Called once per run/restart with the fresh socket description and a
    /// handle that can request restart or stop.
    async fn initialize(
        &self,
        server: ServerHandle,
        lifecycle: LifecycleHandle,
    ) -> Result<(), SettingError>;

    /// Release whatever `initialize` acquired.
    async fn cleanup(&self) -> Result<(), SettingError> {
        Ok(())
    }
}
