mod common;

use std::time::Duration;

use common::{Behavior, spawn};
use ntpclock::{BackgroundSync, NtpClient, NtpError, SyncState};

fn service(servers: &[String], timeout: Duration) -> BackgroundSync {
    let mut client = NtpClient::new();
    client.clear_servers();
    for s in servers {
        client.add_server(s.clone());
    }
    client.set_timeout(timeout).unwrap();
    BackgroundSync::new(client)
}

#[tokio::test]
async fn pass_runs_off_thread_and_publishes() {
    let alive = spawn(Behavior::Reply);
    let sync = service(&[alive.target()], Duration::from_secs(2));
    assert_eq!(sync.last_sync_time(), None);

    let report = sync.start().unwrap().wait().await.unwrap();
    assert!(report.success());
    assert_eq!(sync.state(), SyncState::Succeeded);
    assert!(sync.is_connected());
    assert_eq!(sync.last_sync_time(), report.synced_time());
    assert!(sync.estimated_now().unwrap() >= report.synced_time().unwrap());
    assert!(!sync.sync_due(Duration::from_secs(1800)));

    assert_eq!(sync.acknowledge(), SyncState::Succeeded);
    assert_eq!(sync.state(), SyncState::Idle);
}

#[tokio::test]
async fn second_start_is_refused_while_running() {
    let dead = spawn(Behavior::Silent);
    let sync = service(&[dead.target()], Duration::from_millis(400));

    let task = sync.start().unwrap();
    assert_eq!(sync.state(), SyncState::Running);
    assert!(matches!(sync.start(), Err(NtpError::SyncInProgress)));

    let report = task.wait().await.unwrap();
    assert!(!report.success());
    assert_eq!(sync.state(), SyncState::Failed);
    assert!(!sync.is_connected());

    // Finished passes may be restarted without acknowledging first.
    let again = sync.start().unwrap();
    again.wait().await.unwrap();
    assert_eq!(dead.hits(), 2);
}

#[tokio::test]
async fn cancel_stops_before_next_server() {
    let dead = spawn(Behavior::Silent);
    let alive = spawn(Behavior::Reply);
    let sync = service(&[dead.target(), alive.target()], Duration::from_millis(300));

    let task = sync.start().unwrap();
    task.cancel();
    let report = task.wait().await.unwrap();
    assert!(report.cancelled);
    assert!(!report.success());
    assert!(report.attempts.len() <= 1);
    assert_eq!(alive.hits(), 0);
    assert_eq!(sync.state(), SyncState::Failed);
}

#[tokio::test]
async fn servers_added_through_service_are_used() {
    let dead = spawn(Behavior::Silent);
    let sync = service(&[dead.target()], Duration::from_millis(200));
    assert!(!sync.start().unwrap().wait().await.unwrap().success());

    let alive = spawn(Behavior::Reply);
    sync.add_server(alive.target());
    assert_eq!(sync.servers(), vec![dead.target(), alive.target()]);

    let report = sync.start().unwrap().wait().await.unwrap();
    assert!(report.success());
    assert_eq!(report.attempts.len(), 2);
}

#[tokio::test]
async fn add_server_does_not_wait_for_running_pass() {
    let dead = spawn(Behavior::Silent);
    let sync = service(&[dead.target()], Duration::from_millis(600));
    let task = sync.start().unwrap();
    // Let the pass take the client.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(sync.is_running());

    let alive = spawn(Behavior::Reply);
    let before = std::time::Instant::now();
    sync.add_server(alive.target());
    assert!(before.elapsed() < Duration::from_millis(100));
    assert_eq!(sync.servers(), vec![dead.target(), alive.target()]);

    let first = task.wait().await.unwrap();
    assert_eq!(first.attempts.len(), 1);
    assert_eq!(alive.hits(), 0);

    let second = sync.start().unwrap().wait().await.unwrap();
    assert!(second.success());
    assert_eq!(second.response().unwrap().target.name, alive.target());
}
