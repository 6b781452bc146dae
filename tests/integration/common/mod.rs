#![allow(dead_code)]

use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use assert_cmd::Command;
use tempfile::TempDir;

/// Stand-in for the `couchdb` launcher script. Honours `-b`, `-d`, `-s`, and the
/// path flags, keeping a `sleep` process alive as the "daemon".
pub const FAKE_COUCHDB: &str = r#"#!/bin/sh
mode=""
pidfile=""
while [ $# -gt 0 ]; do
    case "$1" in
        -b) mode=start ;;
        -d) mode=stop ;;
        -s) mode=status ;;
        -p) shift; pidfile="$1" ;;
        -a|-o|-e) shift ;;
    esac
    shift
done

alive() {
    [ -f "$pidfile" ] && kill -0 "$(cat "$pidfile")" 2>/dev/null
}

case "$mode" in
    start)
        if alive; then exit 0; fi
        nohup sleep 30 >/dev/null 2>&1 &
        echo $! > "$pidfile"
        echo "Apache CouchDB has started, time to relax."
        ;;
    stop)
        if [ -f "$pidfile" ]; then
            kill "$(cat "$pidfile")" 2>/dev/null
            rm -f "$pidfile"
        fi
        ;;
    status)
        if alive; then
            echo "Apache CouchDB is running as process $(cat "$pidfile"), time to relax."
        else
            echo "Apache CouchDB is not running."
        fi
        ;;
esac
"#;

/// Launcher that accepts every request but never starts anything.
pub const INERT_COUCHDB: &str = "#!/bin/sh\nexit 0\n";

/// Launcher whose status probe always fails.
pub const BROKEN_COUCHDB: &str = "#!/bin/sh\necho 'pid file unreadable' >&2\nexit 1\n";

/// Isolated runtime root with its own store, settings, and launcher script.
pub struct RuntimeFixture {
    dir: TempDir,
}

impl RuntimeFixture {
    pub fn new(script: &str) -> Self {
        Self::with_timeout(script, "5s")
    }

    pub fn with_timeout(script: &str, timeout: &str) -> Self {
        let dir = tempfile::tempdir().expect("create tempdir");
        let root = dir.path().join(".rt");
        fs::create_dir_all(&root).expect("create runtime root");

        let binary = dir.path().join("couchdb");
        fs::write(&binary, script).expect("write launcher");
        fs::set_permissions(&binary, fs::Permissions::from_mode(0o755))
            .expect("chmod launcher");

        fs::write(
            root.join("couchdb-io.yaml"),
            format!(
                "binary: {}\npoll_interval: 100ms\ntimeout: {timeout}\n",
                binary.display()
            ),
        )
        .expect("write settings");

        Self { dir }
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().join(".rt")
    }

    pub fn store_path(&self) -> PathBuf {
        self.root().join("program.rt.json")
    }

    pub fn config_path(&self) -> PathBuf {
        self.root().join("tmp/couchdb.ini")
    }

    pub fn pid_path(&self) -> PathBuf {
        self.root().join("run/couchdb.pid")
    }

    /// `couchdb-io <args>` bound to this runtime root.
    pub fn cmd(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("couchdb-io"));
        cmd.args(args)
            .env("PINF_RUNTIME", self.store_path())
            .env_remove("COUCHDB_BIN")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Runs `couchdb-io config` and returns the parsed JSON.
    pub fn config_json(&self) -> serde_json::Value {
        let output = self.cmd(&["config"]).output().expect("run config");
        assert!(output.status.success(), "config failed: {output:?}");
        serde_json::from_slice(&output.stdout).expect("config prints JSON")
    }

    /// Port recorded in the store's override layer.
    pub fn override_port(&self) -> Option<u64> {
        let content = fs::read_to_string(self.store_path()).ok()?;
        let value: serde_json::Value = serde_json::from_str(&content).ok()?;
        value
            .pointer("/override/couchdb/httpd/port")
            .and_then(|port| port.as_u64())
    }
}

impl Drop for RuntimeFixture {
    fn drop(&mut self) {
        if let Ok(pid) = fs::read_to_string(self.pid_path())
            && let Ok(pid) = pid.trim().parse::<i32>()
        {
            let _ = nix::sys::signal::kill(
                nix::unistd::Pid::from_raw(pid),
                nix::sys::signal::Signal::SIGKILL,
            );
        }
    }
}

pub fn wait_for_path(path: &Path) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if path.exists() {
            return;
        }
        thread::sleep(Duration::from_millis(100));
    }
    panic!("Timed out waiting for {:?} to exist", path);
}
