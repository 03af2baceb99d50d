//! SPA host.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!                      │                  SPA HOST                    │
//!                      │                                              │
//!     Client Request   │  ┌─────────┐   ┌─────────┐   ┌────────────┐  │
//!     ─────────────────┼─▶│   net   │──▶│  http   │──▶│ dispatcher │  │
//!                      │  │listener │   │ server  │   │ middleware │  │
//!                      │  └─────────┘   └─────────┘   └─────┬──────┘  │
//!     Client Response  │                                    │         │
//!     ◀────────────────┼────────────── ResponseWriter ◀─────┘         │
//!                      │                                              │
//!                      │  ┌────────────────────────────────────────┐  │
//!                      │  │ lifecycle controller (run/stop/restart)│  │
//!                      │  │     └─ settings: hot reload ──────────┐│  │
//!                      │  │          watch → debounce → build ────┘│  │
//!                      │  └────────────────────────────────────────┘  │
//!                      └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use spa_host::config::{load_config, HostConfig};
use spa_host::observability::init_logging;
use spa_host::{HostServer, HotReload, Middleware, ServerSetting, StaticFiles};

#[derive(Parser)]
#[command(name = "spa-host")]
#[command(about = "Serve a single-page application with optional hot reload", long_about = None)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(short, long)]
    port: Option<u16>,

    /// Directory to serve static files from
    #[arg(long)]
    root: Option<PathBuf>,

    /// Disable hot reload even if the config enables it
    #[arg(long)]
    no_reload: bool,
}

impl Cli {
    fn apply(&self, config: &mut HostConfig) {
        if let Some(host) = &self.host {
            config.listener.host = host.clone();
        }
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(root) = &self.root {
            config.static_files.root = root.clone();
        }
        if self.no_reload {
            config.reload.enabled = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => HostConfig::default(),
    };
    cli.apply(&mut config);

    init_logging(&config.observability)?;

    tracing::info!("spa-host v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address(),
        static_root = ?config.static_files.root,
        hot_reload = config.reload.enabled,
        "Configuration loaded"
    );

    let mut middleware: Vec<Arc<dyn Middleware>> = Vec::new();
    if config.static_files.enabled {
        middleware.push(Arc::new(StaticFiles::new(
            config.static_files.root.clone(),
            config.static_files.index.clone(),
        )));
    }

    let hot_reload = Arc::new(HotReload::new(config.reload.clone()));
    let settings: Vec<Arc<dyn ServerSetting>> = vec![hot_reload.clone()];

    let server = HostServer::new(&config, middleware, settings);

    if config.reload.enabled {
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            match serde_json::to_string(&hot_reload.status()) {
                Ok(status) => tracing::info!(status = %status, "Hot reload status"),
                Err(e) => tracing::warn!(error = %e, "Failed to encode hot reload status"),
            }
        });
    }

    server.serve().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
