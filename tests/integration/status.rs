#[path = "common/mod.rs"]
mod common;

use std::fs;

use common::{BROKEN_COUCHDB, FAKE_COUCHDB, RuntimeFixture};
use predicates::prelude::*;

#[test]
fn fresh_runtime_is_not_running() {
    // The broken launcher proves no probe runs without a config file.
    let rt = RuntimeFixture::new(BROKEN_COUCHDB);

    rt.cmd(&["status"])
        .assert()
        .success()
        .stdout(predicate::eq("Running: No\n"));
}

#[test]
fn failing_probe_exits_non_zero() {
    let rt = RuntimeFixture::new(BROKEN_COUCHDB);
    fs::create_dir_all(rt.config_path().parent().unwrap()).unwrap();
    fs::write(rt.config_path(), "[httpd]\nport = 5984").unwrap();

    rt.cmd(&["status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pid file unreadable"));
}

#[test]
fn stale_config_without_process_is_not_running() {
    let rt = RuntimeFixture::new(FAKE_COUCHDB);
    fs::create_dir_all(rt.config_path().parent().unwrap()).unwrap();
    fs::write(rt.config_path(), "[httpd]\nport = 5984").unwrap();

    rt.cmd(&["status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Running: No"));
}
