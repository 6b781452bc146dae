//! Error handling for couchdb-io.
use std::{ffi::OsString, io, path::PathBuf, time::Duration};

use thiserror::Error;

/// Defines all possible errors raised by lifecycle commands.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Error writing, deleting, or creating a runtime file or directory.
    #[error("I/O error on {path:?}: {source}")]
    Io {
        /// The path being accessed.
        path: PathBuf,
        /// The underlying error that occurred.
        #[source]
        source: io::Error,
    },

    /// The daemon's status probe could not be run or failed.
    #[error("Status probe failed: {0}")]
    Probe(#[from] ProbeError),

    /// Error launching the daemon binary for a start or stop request.
    #[error("Failed to launch daemon binary {binary:?}: {source}")]
    Spawn {
        /// The executable that failed to launch.
        binary: OsString,
        /// The underlying error that occurred.
        #[source]
        source: io::Error,
    },

    /// The daemon did not report running before the deadline.
    #[error("Daemon did not report running within {timeout:?}")]
    StartTimeout {
        /// Time waited before giving up.
        timeout: Duration,
    },

    /// The daemon did not report stopped before the deadline.
    #[error("Daemon did not stop within {timeout:?}")]
    StopTimeout {
        /// Time waited before giving up.
        timeout: Duration,
    },

    /// Error reading or writing the runtime-config store.
    #[error("Runtime config store error: {0}")]
    ConfigStore(#[from] StoreError),

    /// Error loading the settings file.
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// No free TCP port could be obtained.
    #[error("Failed to allocate a free port: {0}")]
    Port(#[source] io::Error),
}

impl ControlError {
    /// Wraps an I/O failure with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ControlError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Error type for status probe invocations.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The probe command could not be spawned.
    #[error("failed to run {binary:?}: {source}")]
    Launch {
        /// The executable that failed to launch.
        binary: OsString,
        /// The underlying error that occurred.
        #[source]
        source: io::Error,
    },

    /// The probe exited unsuccessfully without a recognised announcement.
    #[error("probe exited with status {code:?}: {stderr}")]
    Failed {
        /// Exit code, when the probe was not killed by a signal.
        code: Option<i32>,
        /// Captured standard error, trimmed.
        stderr: String,
    },
}

/// Error type for runtime-config store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Error reading the store file.
    #[error("Failed to read store file: {0}")]
    ReadError(#[source] io::Error),

    /// Error parsing the store file.
    #[error("Failed to parse store file: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Error writing the store file.
    #[error("Failed to write store file: {0}")]
    WriteError(#[source] io::Error),

    /// Error acquiring the store lock.
    #[error("Failed to lock store file: {0}")]
    LockError(#[source] io::Error),

    /// A key path does not address an object in the namespace tree.
    #[error("Key '{0}' does not address an object")]
    InvalidKey(String),
}

/// Error type for settings file loading.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Error reading the settings file.
    #[error("Failed to read settings file: {0}")]
    ReadError(#[from] io::Error),

    /// Error parsing YAML settings.
    #[error("Invalid YAML format: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// A duration value could not be parsed.
    #[error("Invalid duration value: '{0}'")]
    InvalidDuration(String),
}
