//! Lifecycle of the transient native config file and the port override behind it.
use serde_json::Value;
use std::{fs, io::ErrorKind};
use tracing::{debug, info};

use crate::constants::CONFIG_NAMESPACE;
use crate::error::ControlError;
use crate::ports::PortAllocator;
use crate::runtime::RuntimeContext;
use crate::store::ConfigStore;
use crate::translate::{self, NativeConfig, PinfConfig};

/// Store key holding the daemon port inside [`CONFIG_NAMESPACE`].
const PORT_KEY: &str = "httpd.port";

/// Both projections of the configuration at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigSnapshot {
    /// Generic projection for external consumers.
    pub generic: PinfConfig,
    /// Daemon-native configuration.
    pub native: NativeConfig,
}

impl ConfigSnapshot {
    fn from_port(port: Option<u16>) -> Self {
        let native = NativeConfig::with_port(port);
        Self {
            generic: translate::to_generic(&native),
            native,
        }
    }
}

/// Owns the transient config file at [`RuntimeContext::config_path`] and keeps it in
/// step with the port override in the runtime-config store.
pub struct ConfigFileManager<'a, S, P> {
    runtime: &'a RuntimeContext,
    store: &'a S,
    ports: &'a P,
}

impl<'a, S: ConfigStore, P: PortAllocator> ConfigFileManager<'a, S, P> {
    /// Creates a manager over the given collaborators.
    pub fn new(runtime: &'a RuntimeContext, store: &'a S, ports: &'a P) -> Self {
        Self {
            runtime,
            store,
            ports,
        }
    }

    /// Port currently committed in the store, if any.
    pub fn committed_port(&self) -> Result<Option<u16>, ControlError> {
        let config = self.store.load()?;
        Ok(config
            .get(CONFIG_NAMESPACE, PORT_KEY)
            .and_then(|value| value.as_u64())
            .and_then(|port| u16::try_from(port).ok())
            .filter(|port| *port != 0))
    }

    /// Returns both projections of the configuration.
    ///
    /// With `read_only` set, the committed port is reported as-is (possibly unset) and
    /// nothing is allocated or written. Otherwise a fresh port is allocated and persisted
    /// as the override.
    pub fn ensure(&self, read_only: bool) -> Result<ConfigSnapshot, ControlError> {
        if read_only {
            return Ok(ConfigSnapshot::from_port(self.committed_port()?));
        }

        let port = self.ports.allocate().map_err(ControlError::Port)?;
        self.commit_port(port)?;
        Ok(ConfigSnapshot::from_port(Some(port)))
    }

    /// Allocates and commits a fresh port, then writes the native config file.
    pub fn write_file(&self) -> Result<ConfigSnapshot, ControlError> {
        let snapshot = self.ensure(false)?;
        self.write_snapshot(&snapshot)?;
        Ok(snapshot)
    }

    /// Rewrites the native config file for the committed port, allocating one only if
    /// none is committed.
    pub fn rewrite_file(&self) -> Result<ConfigSnapshot, ControlError> {
        let snapshot = match self.committed_port()? {
            Some(port) => {
                // Re-commit so the override layer holds the port even when it came from defaults.
                self.commit_port(port)?;
                ConfigSnapshot::from_port(Some(port))
            }
            None => self.ensure(false)?,
        };
        self.write_snapshot(&snapshot)?;
        Ok(snapshot)
    }

    /// Clears the port override.
    pub fn reset(&self) -> Result<(), ControlError> {
        debug!("Clearing {CONFIG_NAMESPACE}.{PORT_KEY} override");
        self.store
            .set_override(CONFIG_NAMESPACE, PORT_KEY, Value::Null)?;
        Ok(())
    }

    /// Clears the port override and deletes the native config file. A file that is
    /// already gone counts as removed.
    pub fn remove_file(&self) -> Result<(), ControlError> {
        self.reset()?;

        let path = self.runtime.config_path();
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed {}", path.display());
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("{} already absent", path.display());
                Ok(())
            }
            Err(err) => Err(ControlError::io(path, err)),
        }
    }

    /// Whether the native config file is present.
    pub fn file_exists(&self) -> bool {
        self.runtime.config_path().exists()
    }

    /// Parses the native config file, or `None` when it does not exist.
    pub fn read_file(&self) -> Result<Option<NativeConfig>, ControlError> {
        let path = self.runtime.config_path();
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(translate::parse(&text))),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(ControlError::io(path, err)),
        }
    }

    fn commit_port(&self, port: u16) -> Result<(), ControlError> {
        self.store
            .set_override(CONFIG_NAMESPACE, PORT_KEY, Value::from(port))?;
        Ok(())
    }

    fn write_snapshot(&self, snapshot: &ConfigSnapshot) -> Result<(), ControlError> {
        let path = self.runtime.config_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| ControlError::io(dir, e))?;
        }
        fs::write(&path, translate::render(&snapshot.native))
            .map_err(|e| ControlError::io(&path, e))?;
        info!(
            "Wrote {} (port {:?})",
            path.display(),
            snapshot.native.port()
        );
        Ok(())
    }
}
