//! The CouchDB executable as an opaque subprocess.
//!
//! Start and stop requests are fire-and-forget: the binary is launched in its own
//! session and the call returns without waiting for the daemon to change state.
//! Status requests run to completion and hand their output back for parsing.
use chrono::Local;
use std::{
    ffi::OsString,
    fs::{File, OpenOptions},
    io::Write,
    os::unix::process::CommandExt,
    path::Path,
    process::{Command, Stdio},
    thread,
};
use tracing::{debug, error};

use crate::error::{ControlError, ProbeError};
use crate::runtime::RuntimeContext;

/// Captured result of one status probe invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeOutput {
    /// Whether the probe exited with status zero.
    pub success: bool,
    /// Exit code, if the probe was not killed by a signal.
    pub code: Option<i32>,
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
}

/// Control surface of the managed daemon.
pub trait DaemonBackend {
    /// Launches the daemon in the background. Does not wait for readiness.
    fn launch_start(&self, runtime: &RuntimeContext) -> Result<(), ControlError>;

    /// Asks the daemon to shut down. Does not wait for it to exit.
    fn launch_stop(&self, runtime: &RuntimeContext) -> Result<(), ControlError>;

    /// Runs the daemon's status command against the transient config and PID file.
    fn run_status(&self, runtime: &RuntimeContext) -> Result<ProbeOutput, ProbeError>;
}

/// Drives the `couchdb` launcher script.
#[derive(Debug, Clone)]
pub struct CouchdbBinary {
    binary: OsString,
}

impl CouchdbBinary {
    /// Creates a backend that invokes `binary`.
    pub fn new(binary: impl Into<OsString>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Executable this backend invokes.
    pub fn binary(&self) -> &OsString {
        &self.binary
    }

    /// Arguments for `couchdb -b`: background start with config, PID, and log paths.
    pub fn start_args(runtime: &RuntimeContext) -> Vec<OsString> {
        vec![
            "-b".into(),
            "-a".into(),
            runtime.config_path().into_os_string(),
            "-p".into(),
            runtime.pid_path().into_os_string(),
            "-o".into(),
            runtime.stdout_log_path().into_os_string(),
            "-e".into(),
            runtime.stderr_log_path().into_os_string(),
        ]
    }

    /// Arguments for `couchdb -d`: shut down the instance recorded in the PID file.
    pub fn stop_args(runtime: &RuntimeContext) -> Vec<OsString> {
        vec![
            "-d".into(),
            "-a".into(),
            runtime.config_path().into_os_string(),
            "-p".into(),
            runtime.pid_path().into_os_string(),
        ]
    }

    /// Arguments for `couchdb -s`: report whether the recorded instance is alive.
    pub fn status_args(runtime: &RuntimeContext) -> Vec<OsString> {
        vec![
            "-a".into(),
            runtime.config_path().into_os_string(),
            "-p".into(),
            runtime.pid_path().into_os_string(),
            "-s".into(),
        ]
    }

    fn launch_detached(
        &self,
        operation: &str,
        args: Vec<OsString>,
        runtime: &RuntimeContext,
    ) -> Result<(), ControlError> {
        runtime.prepare()?;
        let stdout = open_operation_log(
            &runtime.operation_log_path(operation, "stdout"),
            operation,
        )?;
        let stderr = open_operation_log(
            &runtime.operation_log_path(operation, "stderr"),
            operation,
        )?;

        let mut cmd = Command::new(&self.binary);
        cmd.args(&args)
            .current_dir(runtime.root())
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));

        // A new session keeps the daemon alive after this process exits.
        unsafe {
            cmd.pre_exec(|| {
                nix::unistd::setsid()
                    .map(|_| ())
                    .map_err(|errno| std::io::Error::from_raw_os_error(errno as i32))
            });
        }

        debug!("Launching {operation}: {cmd:?}");
        match cmd.spawn() {
            Ok(mut child) => {
                debug!("{operation} launcher running as PID {}", child.id());
                // Reap the launcher once it exits so long-lived callers do not collect zombies.
                thread::spawn(move || {
                    let _ = child.wait();
                });
                Ok(())
            }
            Err(source) => {
                error!("Failed to launch {:?} for {operation}: {source}", self.binary);
                Err(ControlError::Spawn {
                    binary: self.binary.clone(),
                    source,
                })
            }
        }
    }
}

impl DaemonBackend for CouchdbBinary {
    fn launch_start(&self, runtime: &RuntimeContext) -> Result<(), ControlError> {
        self.launch_detached("start", Self::start_args(runtime), runtime)
    }

    fn launch_stop(&self, runtime: &RuntimeContext) -> Result<(), ControlError> {
        self.launch_detached("stop", Self::stop_args(runtime), runtime)
    }

    fn run_status(&self, runtime: &RuntimeContext) -> Result<ProbeOutput, ProbeError> {
        let output = Command::new(&self.binary)
            .args(Self::status_args(runtime))
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ProbeError::Launch {
                binary: self.binary.clone(),
                source,
            })?;

        Ok(ProbeOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Opens an operation log for appending and stamps it with the request time.
fn open_operation_log(path: &Path, operation: &str) -> Result<File, ControlError> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ControlError::io(path, e))?;
    writeln!(
        file,
        "--- {operation} requested at {}",
        Local::now().to_rfc3339()
    )
    .map_err(|e| ControlError::io(path, e))?;
    Ok(file)
}
