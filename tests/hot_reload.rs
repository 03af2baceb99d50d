//! Hot reload integration tests: real filesystem watchers, fake builds.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use spa_host::config::ReloadConfig;
use spa_host::lifecycle::{HostServer, LifecycleCommand, LifecycleHandle, ServerHandle, ServerSetting};
use spa_host::middleware::Middleware;
use spa_host::reload::{BuildError, BuildOutput, BuildRunner, HotReload, ReloadPhase};

mod common;

use common::{client, eventually, test_config, url, Echo};

#[derive(Default)]
struct CountingBuild {
    runs: AtomicUsize,
}

#[async_trait]
impl BuildRunner for CountingBuild {
    async fn run(&self) -> Result<BuildOutput, BuildError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(BuildOutput::default())
    }
}

struct SlowBuild;

#[async_trait]
impl BuildRunner for SlowBuild {
    async fn run(&self) -> Result<BuildOutput, BuildError> {
        tokio::time::sleep(Duration::from_secs(1)).await;
        Ok(BuildOutput::default())
    }
}

fn reload_config(root: &Path) -> ReloadConfig {
    ReloadConfig {
        enabled: true,
        watch_paths: vec![root.to_path_buf()],
        debounce_ms: 100,
        ..ReloadConfig::default()
    }
}

fn server_handle() -> ServerHandle {
    ServerHandle::new("127.0.0.1:3000".parse().unwrap(), 1)
}

// Give the OS watcher a moment to attach before touching files.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(200)).await;
}

#[tokio::test]
async fn source_change_rebuilds_then_requests_restart() {
    let dir = tempfile::tempdir().unwrap();
    let build = Arc::new(CountingBuild::default());
    let plugin = HotReload::with_runner(reload_config(dir.path()), build.clone());
    let (lifecycle, mut commands) = LifecycleHandle::channel();

    plugin.initialize(server_handle(), lifecycle).await.unwrap();
    assert_eq!(plugin.status().active_watchers, 1);
    settle().await;

    std::fs::write(dir.path().join("app.ts"), "export const x = 1;").unwrap();

    let command = tokio::time::timeout(Duration::from_secs(5), commands.recv())
        .await
        .expect("no restart requested")
        .unwrap();
    assert_eq!(command, LifecycleCommand::Restart);
    assert_eq!(build.runs.load(Ordering::SeqCst), 1);
    assert_eq!(plugin.status().phase, ReloadPhase::Idle);

    plugin.cleanup().await.unwrap();
}

#[tokio::test]
async fn status_during_rebuild_reports_reloading() {
    let dir = tempfile::tempdir().unwrap();
    let plugin = HotReload::with_runner(reload_config(dir.path()), Arc::new(SlowBuild));
    let (lifecycle, mut commands) = LifecycleHandle::channel();

    plugin.initialize(server_handle(), lifecycle).await.unwrap();
    settle().await;

    std::fs::write(dir.path().join("app.js"), "x").unwrap();
    assert!(eventually(|| plugin.status().is_reloading).await);

    let status = plugin.status();
    assert_eq!(status.phase, ReloadPhase::Reloading);
    assert_eq!(status.active_watchers, 1);
    assert!(status.enabled);

    let command = tokio::time::timeout(Duration::from_secs(5), commands.recv())
        .await
        .expect("no restart requested")
        .unwrap();
    assert_eq!(command, LifecycleCommand::Restart);
    assert!(!plugin.status().is_reloading);

    plugin.cleanup().await.unwrap();
}

#[tokio::test]
async fn cleanup_during_rebuild_requests_no_restart() {
    let dir = tempfile::tempdir().unwrap();
    let plugin = HotReload::with_runner(reload_config(dir.path()), Arc::new(SlowBuild));
    let (lifecycle, mut commands) = LifecycleHandle::channel();

    plugin.initialize(server_handle(), lifecycle).await.unwrap();
    settle().await;

    std::fs::write(dir.path().join("app.ts"), "x").unwrap();
    assert!(eventually(|| plugin.status().is_reloading).await);

    plugin.cleanup().await.unwrap();
    assert!(!plugin.status().is_reloading);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(commands.try_recv().is_err());
}

#[tokio::test]
async fn ignored_files_do_not_rebuild() {
    let dir = tempfile::tempdir().unwrap();
    let build = Arc::new(CountingBuild::default());
    let plugin = HotReload::with_runner(reload_config(dir.path()), build.clone());
    let (lifecycle, mut commands) = LifecycleHandle::channel();

    plugin.initialize(server_handle(), lifecycle).await.unwrap();
    settle().await;

    std::fs::create_dir(dir.path().join("node_modules")).unwrap();
    std::fs::write(dir.path().join("node_modules").join("dep.js"), "x").unwrap();
    std::fs::write(dir.path().join("styles.css"), "body {}").unwrap();
    std::fs::write(dir.path().join(".scratch.ts"), "x").unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert_eq!(build.runs.load(Ordering::SeqCst), 0);
    assert!(commands.try_recv().is_err());

    plugin.cleanup().await.unwrap();
}

#[tokio::test]
async fn no_rebuild_after_cleanup() {
    let dir = tempfile::tempdir().unwrap();
    let build = Arc::new(CountingBuild::default());
    let plugin = HotReload::with_runner(reload_config(dir.path()), build.clone());
    let (lifecycle, _commands) = LifecycleHandle::channel();

    plugin.initialize(server_handle(), lifecycle).await.unwrap();
    plugin.cleanup().await.unwrap();
    assert_eq!(plugin.status().active_watchers, 0);

    std::fs::write(dir.path().join("app.ts"), "x").unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(build.runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn host_restarts_after_source_change() {
    let dir = tempfile::tempdir().unwrap();
    let build = Arc::new(CountingBuild::default());
    let plugin = Arc::new(HotReload::with_runner(reload_config(dir.path()), build.clone()));

    let middleware: Vec<Arc<dyn Middleware>> = vec![Arc::new(Echo)];
    let settings: Vec<Arc<dyn ServerSetting>> = vec![plugin.clone()];
    let server = HostServer::new(&test_config(), middleware, settings).with_signal_handling(false);
    let lifecycle = server.handle();
    let serving = tokio::spawn(server.serve());

    assert!(eventually(|| lifecycle.server().is_some()).await);
    settle().await;

    std::fs::write(dir.path().join("main.js"), "console.log(1)").unwrap();
    assert!(eventually(|| lifecycle.server().is_some_and(|s| s.generation() >= 2)).await);
    assert!(build.runs.load(Ordering::SeqCst) >= 1);

    // The plugin was re-initialized for the new run and is watching again.
    assert!(eventually(|| plugin.status().active_watchers == 1).await);
    let current = lifecycle.server().unwrap();
    let res = client().get(url(&current, "/")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    lifecycle.stop().unwrap();
    tokio::time::timeout(Duration::from_secs(5), serving)
        .await
        .expect("serve loop did not finish")
        .unwrap()
        .unwrap();
    assert_eq!(plugin.status().active_watchers, 0);
}
