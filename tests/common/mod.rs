//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use spa_host::config::HostConfig;
use spa_host::lifecycle::{LifecycleHandle, ServerHandle, ServerSetting, SettingError};
use spa_host::middleware::{Middleware, MiddlewareError};
use spa_host::{HostRequest, ResponseWriter};

/// Defaults with an ephemeral port and short lifecycle timings.
pub fn test_config() -> HostConfig {
    let mut config = HostConfig::default();
    config.listener.port = 0;
    config.lifecycle.restart_grace_ms = 10;
    config.lifecycle.shutdown_timeout_ms = 500;
    config
}

/// Client that never reuses connections across restarts.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

pub fn url(server: &ServerHandle, path: &str) -> String {
    format!("http://{}{}", server.local_addr(), path)
}

/// Poll `condition` every 20ms for up to 5s.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..250 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

/// Shared, ordered record of setting callbacks ("init:a", "cleanup:b", ...).
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn events(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// A setting that records its callbacks and can be told to fail.
pub struct RecordingSetting {
    name: String,
    log: EventLog,
    fail_initialize: bool,
    fail_cleanup: bool,
    pub servers: Mutex<Vec<ServerHandle>>,
    pub lifecycle: Mutex<Option<LifecycleHandle>>,
}

impl RecordingSetting {
    pub fn new(name: &str, log: &EventLog) -> Arc<Self> {
        Self::build(name, log, false, false)
    }

    pub fn failing_initialize(name: &str, log: &EventLog) -> Arc<Self> {
        Self::build(name, log, true, false)
    }

    pub fn failing_cleanup(name: &str, log: &EventLog) -> Arc<Self> {
        Self::build(name, log, false, true)
    }

    fn build(name: &str, log: &EventLog, fail_initialize: bool, fail_cleanup: bool) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            log: log.clone(),
            fail_initialize,
            fail_cleanup,
            servers: Mutex::new(Vec::new()),
            lifecycle: Mutex::new(None),
        })
    }

    pub fn lifecycle(&self) -> Option<LifecycleHandle> {
        self.lifecycle.lock().unwrap().clone()
    }

    fn record(&self, event: &str) {
        self.log.lock().unwrap().push(format!("{}:{}", event, self.name));
    }
}

#[async_trait]
impl ServerSetting for RecordingSetting {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(
        &self,
        server: ServerHandle,
        lifecycle: LifecycleHandle,
    ) -> Result<(), SettingError> {
        self.record("init");
        self.servers.lock().unwrap().push(server);
        *self.lifecycle.lock().unwrap() = Some(lifecycle);
        if self.fail_initialize {
            return Err(SettingError::msg("initialize failed on purpose"));
        }
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), SettingError> {
        self.record("cleanup");
        if self.fail_cleanup {
            return Err(SettingError::msg("cleanup failed on purpose"));
        }
        Ok(())
    }
}

/// Answers every request with its path, except `/boom` (fails) and `/pass`
/// (passes through).
pub struct Echo;

#[async_trait]
impl Middleware for Echo {
    async fn process(
        &self,
        request: &HostRequest,
        response: &mut ResponseWriter,
    ) -> Result<(), MiddlewareError> {
        match request.path() {
            "/boom" => Err(MiddlewareError::msg("echo exploded")),
            "/pass" => Ok(()),
            path => {
                response.send(StatusCode::OK, "text/plain", format!("echo {}", path))?;
                Ok(())
            }
        }
    }
}
