//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the host.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the SPA host.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HostConfig {
    /// Listener configuration (host, port).
    pub listener: ListenerConfig,

    /// HTTP request handling limits.
    pub http: HttpConfig,

    /// Stop / restart timing.
    pub lifecycle: LifecycleConfig,

    /// Built-in static file middleware.
    pub static_files: StaticFilesConfig,

    /// Hot reload plugin.
    pub reload: ReloadConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host or IP to bind (e.g., "127.0.0.1").
    pub host: String,

    /// TCP port. `0` lets the OS pick one.
    pub port: u16,
}

impl ListenerConfig {
    /// `host:port` string suitable for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// HTTP request handling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,

    /// Maximum buffered request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Lifecycle timing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Pause between closing the old socket and binding the new one on restart.
    pub restart_grace_ms: u64,

    /// Upper bound on draining in-flight connections when the socket closes.
    pub shutdown_timeout_ms: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            restart_grace_ms: 100,
            shutdown_timeout_ms: 5_000,
        }
    }
}

/// Static file / SPA fallback configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// Register the static file middleware.
    pub enabled: bool,

    /// Directory files are served from.
    pub root: PathBuf,

    /// Index document served for HTML routes, relative to `root`.
    pub index: PathBuf,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            root: PathBuf::from("."),
            index: PathBuf::from("index.html"),
        }
    }
}

/// Hot reload configuration.
///
/// Immutable once the plugin is constructed.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReloadConfig {
    /// Enable watching and rebuilding.
    pub enabled: bool,

    /// Directories (or files) to watch recursively. Missing paths are skipped.
    pub watch_paths: Vec<PathBuf>,

    /// Literal substrings; a change whose name contains one is ignored.
    pub exclude_patterns: Vec<String>,

    /// Quiet period before a rebuild starts, in milliseconds.
    pub debounce_ms: u64,

    /// File extensions (without the dot) that qualify for a reload.
    pub extensions: Vec<String>,

    /// Rebuild command: program followed by its arguments.
    pub build_command: Vec<String>,

    /// Optional long-lived companion process started with the watchers.
    pub dev_command: Option<Vec<String>>,

    /// How long the dev process gets to exit after SIGTERM before it is killed.
    pub dev_stop_timeout_ms: u64,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            watch_paths: vec![PathBuf::from("./src")],
            exclude_patterns: vec![
                "node_modules".to_string(),
                "dist".to_string(),
                ".git".to_string(),
                "*.log".to_string(),
            ],
            debounce_ms: 300,
            extensions: vec!["ts".to_string(), "js".to_string(), "json".to_string()],
            build_command: vec!["npm".to_string(), "run".to_string(), "build".to_string()],
            dev_command: None,
            dev_stop_timeout_ms: 5_000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) used when RUST_LOG is unset.
    pub log_level: String,

    /// Pretty for development, JSON for log shipping.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}
