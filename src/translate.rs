//! Conversion between the generic runtime projection and CouchDB's native config.
//!
//! Only one setting crosses the boundary: the HTTP port. The generic side calls it
//! `io.port`, the native side `httpd.port`.
use serde::{Deserialize, Serialize};

/// `io` section of the generic projection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoSection {
    /// Port the daemon listens on, if one has been committed.
    pub port: Option<u16>,
}

/// Generic view handed to external consumers: `{ io: { port } }`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinfConfig {
    /// I/O settings.
    pub io: IoSection,
}

/// `[httpd]` section of the native config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpdSection {
    /// Port CouchDB binds its HTTP interface to.
    pub port: Option<u16>,
}

/// Daemon-native configuration: `{ httpd: { port } }`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeConfig {
    /// HTTP server settings.
    pub httpd: HttpdSection,
}

impl NativeConfig {
    /// Native config binding the given port.
    pub fn with_port(port: Option<u16>) -> Self {
        Self {
            httpd: HttpdSection { port },
        }
    }

    /// The configured HTTP port.
    pub fn port(&self) -> Option<u16> {
        self.httpd.port
    }
}

/// Maps the generic projection onto the native shape.
pub fn to_native(generic: &PinfConfig) -> NativeConfig {
    NativeConfig::with_port(generic.io.port)
}

/// Derives the generic projection from the native shape.
pub fn to_generic(native: &NativeConfig) -> PinfConfig {
    PinfConfig {
        io: IoSection {
            port: native.httpd.port,
        },
    }
}

/// Renders the native config as CouchDB's ini text: a section header followed by
/// `key = value` lines, joined with `\n` and without a trailing newline.
///
/// Unset keys are omitted.
pub fn render(native: &NativeConfig) -> String {
    let mut lines = vec!["[httpd]".to_string()];
    if let Some(port) = native.httpd.port {
        lines.push(format!("port = {port}"));
    }
    lines.join("\n")
}

/// Reads native ini text back into a [`NativeConfig`].
///
/// Comments (`;` or `#`), blank lines, unknown sections and unknown keys are skipped.
/// A `port` value that is not a valid port reads as unset.
pub fn parse(text: &str) -> NativeConfig {
    let mut native = NativeConfig::default();
    let mut section = String::new();

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            section = name.trim().to_string();
            continue;
        }

        if let Some((key, value)) = line.split_once('=')
            && section == "httpd"
            && key.trim() == "port"
        {
            native.httpd.port = value.trim().parse::<u16>().ok().filter(|p| *p != 0);
        }
    }

    native
}
