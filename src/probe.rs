//! Point-in-time liveness probing through the daemon's own status command.
use regex::Regex;
use std::{fmt, sync::LazyLock};
use tracing::debug;

use crate::backend::DaemonBackend;
use crate::constants::{NOT_RUNNING_ANNOUNCEMENT_PATTERN, RUNNING_ANNOUNCEMENT_PATTERN};
use crate::error::ProbeError;
use crate::runtime::RuntimeContext;

static RUNNING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(RUNNING_ANNOUNCEMENT_PATTERN).expect("running announcement pattern compiles")
});

static NOT_RUNNING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(NOT_RUNNING_ANNOUNCEMENT_PATTERN)
        .expect("not-running announcement pattern compiles")
});

/// What a single probe observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservedState {
    /// No managed instance is alive.
    NotRunning,
    /// The daemon reported itself alive under this PID.
    Running {
        /// Process id as announced by the daemon. Not independently verified.
        pid: u32,
    },
}

impl ObservedState {
    /// PID of the running instance, if any.
    pub fn pid(&self) -> Option<u32> {
        match self {
            ObservedState::Running { pid } => Some(*pid),
            ObservedState::NotRunning => None,
        }
    }

    /// Whether the daemon was observed running.
    pub fn is_running(&self) -> bool {
        matches!(self, ObservedState::Running { .. })
    }
}

impl fmt::Display for ObservedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObservedState::Running { pid } => write!(f, "Yes (pid: {pid})"),
            ObservedState::NotRunning => write!(f, "No"),
        }
    }
}

/// Interpretation of the status command's standard output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Announcement {
    /// The output announced a live process.
    Running(u32),
    /// The output announced that nothing is running.
    NotRunning,
    /// The output matched neither announcement.
    Unrecognised,
}

/// Turns status command output into an [`Announcement`].
pub trait StatusParser {
    fn parse(&self, stdout: &str) -> Announcement;
}

/// Matches the announcements printed by the `couchdb -s` launcher script.
#[derive(Debug, Default, Clone, Copy)]
pub struct CouchdbAnnouncements;

impl StatusParser for CouchdbAnnouncements {
    fn parse(&self, stdout: &str) -> Announcement {
        if let Some(caps) = RUNNING_RE.captures(stdout) {
            return match caps[1].parse::<u32>() {
                Ok(pid) if pid > 0 => Announcement::Running(pid),
                _ => Announcement::Unrecognised,
            };
        }
        if NOT_RUNNING_RE.is_match(stdout) {
            return Announcement::NotRunning;
        }
        Announcement::Unrecognised
    }
}

/// Probes the daemon described by the transient config file.
pub struct ProcessProber<'a, B, Q> {
    runtime: &'a RuntimeContext,
    backend: &'a B,
    parser: &'a Q,
}

impl<'a, B: DaemonBackend, Q: StatusParser> ProcessProber<'a, B, Q> {
    pub fn new(runtime: &'a RuntimeContext, backend: &'a B, parser: &'a Q) -> Self {
        Self {
            runtime,
            backend,
            parser,
        }
    }

    /// Takes one sample of the daemon's state.
    ///
    /// Without a transient config file there is no managed instance, so the daemon is
    /// reported as not running and no subprocess is started.
    pub fn is_running(&self) -> Result<ObservedState, ProbeError> {
        let config_path = self.runtime.config_path();
        if !config_path.exists() {
            debug!("{} absent; daemon not running", config_path.display());
            return Ok(ObservedState::NotRunning);
        }

        let output = self.backend.run_status(self.runtime)?;
        let state = match self.parser.parse(&output.stdout) {
            Announcement::Running(pid) => ObservedState::Running { pid },
            Announcement::NotRunning => ObservedState::NotRunning,
            Announcement::Unrecognised if output.success => ObservedState::NotRunning,
            Announcement::Unrecognised => {
                return Err(ProbeError::Failed {
                    code: output.code,
                    stderr: output.stderr.trim().to_string(),
                });
            }
        };

        debug!("Probe observed {state:?}");
        Ok(state)
    }
}
