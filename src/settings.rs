//! Settings for the controller: which binary to run and how long to wait for it.
use serde::Deserialize;
use std::{env, ffi::OsString, fs, path::Path, time::Duration};
use tracing::debug;

use crate::constants::{
    BINARY_ENV_VAR, DEFAULT_CONVERGE_TIMEOUT, DEFAULT_DAEMON_BINARY, DEFAULT_POLL_INTERVAL,
};
use crate::error::SettingsError;

/// Raw structure of `couchdb-io.yaml`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    /// Daemon executable.
    binary: Option<String>,
    /// Interval between probes, e.g. `"1s"` or `"250ms"`.
    poll_interval: Option<DurationValue>,
    /// Convergence deadline for start and stop.
    timeout: Option<DurationValue>,
}

/// A duration written either as bare seconds or as a string with a unit.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    fn resolve(&self) -> Result<Duration, SettingsError> {
        match self {
            DurationValue::Seconds(secs) => Ok(Duration::from_secs(*secs)),
            DurationValue::Text(text) => parse_duration(text),
        }
    }
}

/// Resolved settings threaded through a single command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Daemon executable.
    pub binary: OsString,
    /// Interval between probes while converging.
    pub poll_interval: Duration,
    /// Deadline for start and stop convergence.
    pub timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            binary: OsString::from(DEFAULT_DAEMON_BINARY),
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_CONVERGE_TIMEOUT,
        }
    }
}

impl Settings {
    /// Loads settings from `path` when it exists, then applies `COUCHDB_BIN`.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let mut settings = Settings::default();

        if path.exists() {
            debug!("Loading settings from {}", path.display());
            let content = fs::read_to_string(path)?;
            let raw: SettingsFile = if content.trim().is_empty() {
                SettingsFile::default()
            } else {
                serde_yaml::from_str(&content)?
            };

            if let Some(binary) = raw.binary {
                settings.binary = OsString::from(binary);
            }
            if let Some(interval) = raw.poll_interval {
                settings.poll_interval = interval.resolve()?;
            }
            if let Some(timeout) = raw.timeout {
                settings.timeout = timeout.resolve()?;
            }
        }

        if let Some(binary) = env::var_os(BINARY_ENV_VAR).filter(|b| !b.is_empty()) {
            settings.binary = binary;
        }

        Ok(settings)
    }
}

/// Parses `"250ms"`, `"5s"`, `"2m"`, `"1h"`, or a bare number of seconds.
pub fn parse_duration(raw: &str) -> Result<Duration, SettingsError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(SettingsError::InvalidDuration(raw.to_string()));
    }

    let (amount_str, millis_per_unit) = if let Some(stripped) = value.strip_suffix("ms") {
        (stripped.trim(), 1)
    } else if let Some(stripped) = value.strip_suffix('s') {
        (stripped.trim(), 1_000)
    } else if let Some(stripped) = value.strip_suffix('m') {
        (stripped.trim(), 60_000)
    } else if let Some(stripped) = value.strip_suffix('h') {
        (stripped.trim(), 3_600_000)
    } else {
        (value, 1_000)
    };

    let amount: u64 = amount_str
        .parse()
        .map_err(|_| SettingsError::InvalidDuration(raw.to_string()))?;

    Ok(Duration::from_millis(amount.saturating_mul(millis_per_unit)))
}
