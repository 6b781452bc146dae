//! Start, stop, status, and config flows for the managed daemon.
//!
//! Start and stop share one shape: materialise the transient config, hand a request
//! to the daemon binary, then poll the status probe until the desired state is
//! observed or the deadline passes.
use serde::Serialize;
use tracing::{info, warn};

use crate::backend::DaemonBackend;
use crate::config_file::{ConfigFileManager, ConfigSnapshot};
use crate::converge::{ConvergePolicy, Convergence, DesiredState, poll_until};
use crate::error::ControlError;
use crate::ports::PortAllocator;
use crate::probe::{CouchdbAnnouncements, ObservedState, ProcessProber, StatusParser};
use crate::runtime::RuntimeContext;
use crate::store::ConfigStore;
use crate::translate::{NativeConfig, PinfConfig};

/// Output of the `config` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConfigReport {
    /// Generic projection.
    pub pinf: PinfConfig,
    /// Daemon-native view.
    pub couchdb: NativeConfig,
}

impl From<ConfigSnapshot> for ConfigReport {
    fn from(snapshot: ConfigSnapshot) -> Self {
        Self {
            pinf: snapshot.generic,
            couchdb: snapshot.native,
        }
    }
}

impl ConfigReport {
    /// Pretty-printed JSON with four-space indentation.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// Lifecycle controller for one daemon instance.
///
/// Only one start or stop is expected to run against a runtime root at a time.
pub struct Lifecycle<B, S, P, Q = CouchdbAnnouncements> {
    runtime: RuntimeContext,
    backend: B,
    store: S,
    ports: P,
    parser: Q,
    policy: ConvergePolicy,
}

impl<B, S, P> Lifecycle<B, S, P>
where
    B: DaemonBackend,
    S: ConfigStore,
    P: PortAllocator,
{
    /// Creates a controller that parses CouchDB's status announcements.
    pub fn new(
        runtime: RuntimeContext,
        backend: B,
        store: S,
        ports: P,
        policy: ConvergePolicy,
    ) -> Self {
        Self::with_parser(runtime, backend, store, ports, CouchdbAnnouncements, policy)
    }
}

impl<B, S, P, Q> Lifecycle<B, S, P, Q>
where
    B: DaemonBackend,
    S: ConfigStore,
    P: PortAllocator,
    Q: StatusParser,
{
    /// Creates a controller with a custom status output parser.
    pub fn with_parser(
        runtime: RuntimeContext,
        backend: B,
        store: S,
        ports: P,
        parser: Q,
        policy: ConvergePolicy,
    ) -> Self {
        Self {
            runtime,
            backend,
            store,
            ports,
            parser,
            policy,
        }
    }

    /// Runtime layout this controller operates on.
    pub fn runtime(&self) -> &RuntimeContext {
        &self.runtime
    }

    /// Config file manager bound to this controller's collaborators.
    pub fn config_files(&self) -> ConfigFileManager<'_, S, P> {
        ConfigFileManager::new(&self.runtime, &self.store, &self.ports)
    }

    fn prober(&self) -> ProcessProber<'_, B, Q> {
        ProcessProber::new(&self.runtime, &self.backend, &self.parser)
    }

    /// One probe, no polling, no side effects.
    pub fn status(&self) -> Result<ObservedState, ControlError> {
        Ok(self.prober().is_running()?)
    }

    /// Reads both configuration projections without allocating or writing anything.
    pub fn config(&self) -> Result<ConfigReport, ControlError> {
        Ok(self.config_files().ensure(true)?.into())
    }

    /// Starts the daemon on a freshly allocated port and waits until it reports running.
    ///
    /// If an instance is already running against the current config file, it is left
    /// alone and its state is returned. On timeout the config file and any daemon
    /// process are left in place.
    pub fn start(&self) -> Result<ObservedState, ControlError> {
        let current = self.status()?;
        if let ObservedState::Running { pid } = current {
            warn!("couchdb already running (pid {pid}); skipping duplicate start");
            return Ok(current);
        }

        self.runtime.prepare()?;
        let snapshot = self.config_files().write_file()?;
        info!(
            "Starting couchdb on port {}",
            snapshot.native.port().map_or("?".to_string(), |p| p.to_string())
        );
        self.backend.launch_start(&self.runtime)?;

        match self.converge(DesiredState::Running)? {
            Convergence::Converged(state) => {
                info!("couchdb running ({state})");
                Ok(state)
            }
            Convergence::TimedOut { last, waited } => {
                warn!("couchdb not running after {waited:?}; last observed {last:?}");
                Err(ControlError::StartTimeout {
                    timeout: self.policy.timeout,
                })
            }
        }
    }

    /// Stops the daemon, waits until it reports stopped, then clears the port override
    /// and deletes the config file.
    ///
    /// Teardown only happens after the stop is confirmed; on timeout everything is left
    /// in place.
    pub fn stop(&self) -> Result<(), ControlError> {
        self.runtime.prepare()?;
        let files = self.config_files();
        files.rewrite_file()?;
        info!("Stopping couchdb");
        self.backend.launch_stop(&self.runtime)?;

        match self.converge(DesiredState::Stopped)? {
            Convergence::Converged(_) => {
                files.remove_file()?;
                info!("couchdb stopped");
                Ok(())
            }
            Convergence::TimedOut { last, waited } => {
                warn!("couchdb still running after {waited:?}; last observed {last:?}");
                Err(ControlError::StopTimeout {
                    timeout: self.policy.timeout,
                })
            }
        }
    }

    fn converge(&self, desired: DesiredState) -> Result<Convergence, ControlError> {
        let prober = self.prober();
        Ok(poll_until(desired, self.policy, || prober.is_running())?)
    }
}
