#[path = "common/mod.rs"]
mod common;

use common::{FAKE_COUCHDB, RuntimeFixture};
use predicates::prelude::*;

#[test]
fn missing_command_prints_usage_and_fails() {
    let rt = RuntimeFixture::new(FAKE_COUCHDB);

    rt.cmd(&[])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn unknown_command_fails() {
    let rt = RuntimeFixture::new(FAKE_COUCHDB);

    rt.cmd(&["restart"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("restart"));
}

#[test]
fn version_flag_prints_version() {
    let rt = RuntimeFixture::new(FAKE_COUCHDB);

    rt.cmd(&["--version"])
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn missing_binary_fails_start() {
    let rt = RuntimeFixture::new(FAKE_COUCHDB);

    rt.cmd(&["start"])
        .env("COUCHDB_BIN", rt.root().join("does-not-exist"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to launch daemon binary"));
}

#[test]
fn invalid_settings_fail_before_touching_state() {
    let rt = RuntimeFixture::new(FAKE_COUCHDB);
    std::fs::write(rt.root().join("couchdb-io.yaml"), "timeout: soon\n").unwrap();

    rt.cmd(&["start"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid duration value"));
    assert!(!rt.store_path().exists());
}

#[test]
fn verbose_logs_to_stderr_only() {
    let rt = RuntimeFixture::new(FAKE_COUCHDB);

    rt.cmd(&["-v", "status"])
        .assert()
        .success()
        .stdout(predicate::eq("Running: No\n"))
        .stderr(predicate::str::contains("Runtime root"));
}
