//! Runtime root resolution and the fixed file layout beneath it.
use std::{
    env,
    path::{Path, PathBuf},
};

use crate::constants::{
    DAEMON_NAME, DEFAULT_RUNTIME_SUBDIR, DEFAULT_STORE_FILE_NAME, LOG_DIR, RUN_DIR,
    RUNTIME_ENV_VAR, SETTINGS_FILE_NAME, TMP_DIR,
};
use crate::error::ControlError;

/// Paths of every file the controller or the daemon touches for one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeContext {
    root: PathBuf,
    store_path: PathBuf,
}

impl RuntimeContext {
    /// Builds a context whose store lives at `store_path`; the runtime root is its parent.
    pub fn from_store_path(store_path: impl Into<PathBuf>) -> Self {
        let store_path = store_path.into();
        let root = store_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self { root, store_path }
    }

    /// Resolves the context from `PINF_RUNTIME`, falling back to a store under `$HOME`.
    pub fn from_env() -> Self {
        match env::var_os(RUNTIME_ENV_VAR) {
            Some(path) if !path.is_empty() => Self::from_store_path(PathBuf::from(path)),
            _ => {
                let home = env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/"));
                Self::from_store_path(
                    home.join(DEFAULT_RUNTIME_SUBDIR)
                        .join(DEFAULT_STORE_FILE_NAME),
                )
            }
        }
    }

    /// Runtime root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Runtime-config store file.
    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    /// Optional settings file.
    pub fn settings_path(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE_NAME)
    }

    /// `run/couchdb.pid`
    pub fn pid_path(&self) -> PathBuf {
        self.root.join(RUN_DIR).join(format!("{DAEMON_NAME}.pid"))
    }

    /// `log/couchdb.stdout.log`
    pub fn stdout_log_path(&self) -> PathBuf {
        self.log_path("stdout")
    }

    /// `log/couchdb.stderr.log`
    pub fn stderr_log_path(&self) -> PathBuf {
        self.log_path("stderr")
    }

    /// `tmp/couchdb.ini`, the transient native config file.
    pub fn config_path(&self) -> PathBuf {
        self.root.join(TMP_DIR).join(format!("{DAEMON_NAME}.ini"))
    }

    /// Capture file for the output of a start or stop invocation,
    /// e.g. `log/couchdb.start.stdout.log`.
    pub fn operation_log_path(&self, operation: &str, stream: &str) -> PathBuf {
        self.log_path(&format!("{operation}.{stream}"))
    }

    fn log_path(&self, stream: &str) -> PathBuf {
        self.root
            .join(LOG_DIR)
            .join(format!("{DAEMON_NAME}.{stream}.log"))
    }

    /// Creates the `run`, `log`, and `tmp` directories.
    pub fn prepare(&self) -> Result<(), ControlError> {
        for dir in [RUN_DIR, LOG_DIR, TMP_DIR] {
            let path = self.root.join(dir);
            std::fs::create_dir_all(&path).map_err(|e| ControlError::io(&path, e))?;
        }
        Ok(())
    }
}
