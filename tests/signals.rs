//! Termination signals reach the controller. Kept in its own test binary
//! because the handler is process-wide.
#![cfg(unix)]

use std::sync::Arc;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use spa_host::lifecycle::{HostServer, ServerSetting};

mod common;

use common::{event_log, events, eventually, test_config, RecordingSetting};

#[tokio::test]
async fn sigterm_after_run_stops_and_cleans_up() {
    let log = event_log();
    let settings: Vec<Arc<dyn ServerSetting>> = vec![RecordingSetting::new("a", &log)];
    let mut server = HostServer::new(&test_config(), vec![], settings);

    server.run().await.unwrap();
    assert!(server.is_running());

    kill(Pid::this(), Signal::SIGTERM).unwrap();

    assert!(eventually(|| !server.is_running()).await);
    assert!(eventually(|| events(&log).len() == 2).await);
    assert_eq!(events(&log), ["init:a", "cleanup:a"]);
}
