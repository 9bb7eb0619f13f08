mod common;

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use assert_cmd::Command;
use predicates::str::contains;

use common::{Behavior, spawn};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("ntpclock-cli-{}-{name}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn ntpclock(name: &str) -> Command {
    let mut cmd = Command::cargo_bin("ntpclock").unwrap();
    cmd.env("NTPCLOCK_CONFIG_DIR", scratch_dir(name))
        .env_remove("RUST_LOG")
        .arg("--no-color");
    cmd
}

#[test]
fn syncs_against_given_server() {
    let alive = spawn(Behavior::Reply);
    ntpclock("text")
        .arg(alive.target())
        .assert()
        .success()
        .stdout(contains(format!("Server: {}", alive.target())))
        .stdout(contains("UTC Time:"));
}

#[test]
fn json_output() {
    let alive = spawn(Behavior::Reply);
    ntpclock("json")
        .args(["--json", &alive.target()])
        .assert()
        .success()
        .stdout(contains("\"success\":true"))
        .stdout(contains("\"schema_version\":1"));
}

#[test]
fn all_servers_failing_exits_one() {
    let dead = spawn(Behavior::Silent);
    ntpclock("fail")
        .args(["--timeout", "200", &dead.target()])
        .assert()
        .code(1)
        .stdout(contains("Sync failed"))
        .stdout(contains("[timeout]"));
}

#[test]
fn add_server_appends_after_positional() {
    let dead = spawn(Behavior::Silent);
    let alive = spawn(Behavior::Reply);
    ntpclock("append")
        .args(["-v", "--timeout", "200", &dead.target()])
        .args(["--add-server", &alive.target()])
        .assert()
        .success()
        .stdout(contains(format!("Server: {}", alive.target())))
        .stdout(contains(format!("{} [timeout]", dead.target())));
}

#[test]
fn servers_come_from_config_file() {
    let alive = spawn(Behavior::Reply);
    let dir = scratch_dir("config");
    fs::write(
        dir.join("config.toml"),
        format!("[client]\nservers = [\"{}\"]\ntimeout_ms = 1000\n", alive.target()),
    )
    .unwrap();
    ntpclock("config")
        .assert()
        .success()
        .stdout(contains(alive.target()));
}

#[test]
fn invalid_config_exits_two() {
    let dir = scratch_dir("bad-config");
    let path = dir.join("broken.toml");
    fs::write(&path, "[client]\ntimeout_ms = 0\n").unwrap();
    ntpclock("bad-config")
        .arg("--config")
        .arg(&path)
        .assert()
        .code(2)
        .stdout(contains("Error:"));
}

#[test]
fn interval_requires_watch() {
    ntpclock("interval")
        .args(["--interval", "5", "127.0.0.1"])
        .assert()
        .code(2)
        .stdout(contains("--interval requires --watch"));
}

#[test]
fn zero_timeout_is_a_usage_error() {
    ntpclock("zero")
        .args(["--timeout", "0", "127.0.0.1"])
        .assert()
        .failure()
        .stderr(contains("timeout"));
}

#[test]
fn ipv6_target_is_reported() {
    ntpclock("ipv6")
        .args(["--timeout", "200", "[::1]:123"])
        .assert()
        .code(1)
        .stdout(contains("[invalid_target]"));
}

#[test]
fn watch_mode_resyncs_until_stopped() {
    let alive = spawn(Behavior::Reply);
    let out = ntpclock("watch")
        .args(["--watch", "--interval", "1", &alive.target()])
        .timeout(Duration::from_millis(2600))
        .assert()
        .interrupted()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8_lossy(&out);
    let lines = text.lines().filter(|l| l.contains(&alive.target())).count();
    assert!(lines >= 2, "{text}");
    assert!(alive.hits() >= 2);
}
