//! Constants and default values for the CouchDB lifecycle controller.
//!
//! This module centralizes file names, environment variables, and timing values
//! so the runtime layout and convergence policy are defined in one place.

use std::time::Duration;

// ============================================================================
// Daemon Identity
// ============================================================================

/// Name of the managed daemon. Used as the stem of every runtime file.
pub const DAEMON_NAME: &str = "couchdb";

/// Executable invoked when no binary override is configured.
pub const DEFAULT_DAEMON_BINARY: &str = "couchdb";

/// Runtime-config namespace holding the daemon's override layer.
pub const CONFIG_NAMESPACE: &str = "couchdb";

// ============================================================================
// Environment Variables
// ============================================================================

/// Points at the runtime-config store file. Its parent directory is the runtime root.
pub const RUNTIME_ENV_VAR: &str = "PINF_RUNTIME";

/// Overrides the daemon executable for this invocation.
pub const BINARY_ENV_VAR: &str = "COUCHDB_BIN";

// ============================================================================
// File System Layout
// ============================================================================

/// Store file name used when `PINF_RUNTIME` is not set.
pub const DEFAULT_STORE_FILE_NAME: &str = "program.rt.json";

/// Directory under `$HOME` used as the runtime root when `PINF_RUNTIME` is not set.
pub const DEFAULT_RUNTIME_SUBDIR: &str = ".local/share/couchdb-io";

/// Optional settings file looked up in the runtime root.
pub const SETTINGS_FILE_NAME: &str = "couchdb-io.yaml";

/// Suffix of the advisory lock file guarding store writes.
pub const STORE_LOCK_SUFFIX: &str = ".lock";

/// Runtime subdirectory holding the PID file.
pub const RUN_DIR: &str = "run";

/// Runtime subdirectory holding daemon and operation logs.
pub const LOG_DIR: &str = "log";

/// Runtime subdirectory holding the transient native config file.
pub const TMP_DIR: &str = "tmp";

// ============================================================================
// Convergence Timing
// ============================================================================

/// Interval between probes while waiting for the daemon to change state.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Maximum time to wait for the daemon to reach the desired state.
pub const DEFAULT_CONVERGE_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Probe Output
// ============================================================================

/// Announcement printed by `couchdb -s` when an instance is alive.
pub const RUNNING_ANNOUNCEMENT_PATTERN: &str =
    r"Apache CouchDB is running as process (\d+), time to relax\.";

/// Announcement printed by `couchdb -s` when no instance is alive.
pub const NOT_RUNNING_ANNOUNCEMENT_PATTERN: &str = r"Apache CouchDB is not running\.";
