//! couchdb-io controls the lifecycle of a single CouchDB daemon for a program's
//! runtime directory. It allocates a port, records it in the runtime config store,
//! writes the daemon's native config file, and starts, stops, or probes the daemon
//! through its own launcher, polling until the requested state is observed.

/// Daemon executable invocation.
pub mod backend;

/// CLI interface.
pub mod cli;

/// Transient native config file management.
pub mod config_file;

/// Constants and default values.
pub mod constants;

/// Poll-until-converged primitive.
pub mod converge;

/// Error handling.
pub mod error;

/// Start, stop, status, and config flows.
pub mod lifecycle;

/// Free port allocation.
pub mod ports;

/// Liveness probing.
pub mod probe;

/// Runtime root and file layout.
pub mod runtime;

/// Settings file and environment overrides.
pub mod settings;

/// Runtime configuration store.
pub mod store;

/// Generic and native config shapes.
pub mod translate;

#[doc(hidden)]
pub mod test_utils;
