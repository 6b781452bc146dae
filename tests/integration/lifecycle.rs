#[path = "common/mod.rs"]
mod common;

use std::{
    fs,
    time::{Duration, Instant},
};

use common::{FAKE_COUCHDB, INERT_COUCHDB, RuntimeFixture};
use predicates::prelude::*;

#[test]
fn full_lifecycle_returns_to_initial_state() {
    let rt = RuntimeFixture::new(FAKE_COUCHDB);

    rt.cmd(&["status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Running: No"));
    let initial = rt.config_json();
    assert!(initial["pinf"]["io"]["port"].is_null());

    rt.cmd(&["start"]).assert().success();

    rt.cmd(&["status"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"Running: Yes \(pid: \d+\)").unwrap());

    let running = rt.config_json();
    let port = running["pinf"]["io"]["port"]
        .as_u64()
        .expect("port allocated while running");
    assert_eq!(running["couchdb"]["httpd"]["port"].as_u64(), Some(port));
    assert_eq!(rt.override_port(), Some(port));
    assert_eq!(
        fs::read_to_string(rt.config_path()).unwrap(),
        format!("[httpd]\nport = {port}")
    );

    rt.cmd(&["stop"]).assert().success();

    rt.cmd(&["status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Running: No"));
    assert!(!rt.config_path().exists());
    assert_eq!(rt.override_port(), None);
    assert_eq!(rt.config_json(), initial);
}

#[test]
fn config_is_stable_across_reads() {
    let rt = RuntimeFixture::new(FAKE_COUCHDB);

    let first = rt.cmd(&["config"]).output().unwrap();
    let second = rt.cmd(&["config"]).output().unwrap();

    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);
    assert!(!rt.store_path().exists(), "config must not write the store");
    assert!(
        String::from_utf8_lossy(&first.stdout).contains("\n    \"pinf\": {\n        \"io\""),
        "config output should use four-space indentation"
    );
}

#[test]
fn start_reports_timeout_when_daemon_never_runs() {
    let rt = RuntimeFixture::with_timeout(INERT_COUCHDB, "1s");

    let started = Instant::now();
    rt.cmd(&["start"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("did not report running"));
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_secs(1));
    // Left in place for inspection.
    assert!(rt.config_path().exists());
}

#[test]
fn repeated_start_keeps_the_running_instance() {
    let rt = RuntimeFixture::new(FAKE_COUCHDB);

    rt.cmd(&["start"]).assert().success();
    let pid = fs::read_to_string(rt.pid_path()).unwrap();
    let port = rt.override_port();

    rt.cmd(&["start"]).assert().success();

    assert_eq!(fs::read_to_string(rt.pid_path()).unwrap(), pid);
    assert_eq!(rt.override_port(), port);

    rt.cmd(&["stop"]).assert().success();
}

#[test]
fn stop_writes_operation_logs() {
    let rt = RuntimeFixture::new(FAKE_COUCHDB);

    rt.cmd(&["start"]).assert().success();
    rt.cmd(&["stop"]).assert().success();

    let start_log =
        fs::read_to_string(rt.root().join("log/couchdb.start.stdout.log")).unwrap();
    assert!(start_log.contains("--- start requested at "));
    common::wait_for_path(&rt.root().join("log/couchdb.stop.stdout.log"));
}
