//! File-backed runtime configuration store with a default layer and an override layer.
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{
    fs::{self, OpenOptions},
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::constants::STORE_LOCK_SUFFIX;
use crate::error::StoreError;

/// Persisted runtime configuration. Each layer maps a namespace to an arbitrary tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Values supplied by the program's defaults.
    #[serde(default)]
    pub default: Map<String, Value>,
    /// Values written at runtime; these take precedence over `default`.
    #[serde(default, rename = "override")]
    pub overrides: Map<String, Value>,
}

impl RuntimeConfig {
    /// Returns the namespace tree with the override layer merged over the default layer.
    ///
    /// A `null` in the override layer leaves the default in place.
    pub fn merged(&self, namespace: &str) -> Value {
        let mut merged = self
            .default
            .get(namespace)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        if let Some(overrides) = self.overrides.get(namespace) {
            merge_into(&mut merged, overrides);
        }
        merged
    }

    /// Looks up a dotted key (e.g. `httpd.port`) in the merged namespace tree.
    pub fn get(&self, namespace: &str, key: &str) -> Option<Value> {
        lookup(&self.merged(namespace), key)
            .filter(|value| !value.is_null())
            .cloned()
    }

    /// Looks up a dotted key in the override layer only.
    pub fn get_override(&self, namespace: &str, key: &str) -> Option<Value> {
        self.overrides
            .get(namespace)
            .and_then(|tree| lookup(tree, key))
            .filter(|value| !value.is_null())
            .cloned()
    }

    /// Sets a dotted key in the override layer, creating intermediate objects.
    pub fn set_override(
        &mut self,
        namespace: &str,
        key: &str,
        value: Value,
    ) -> Result<(), StoreError> {
        let tree = self
            .overrides
            .entry(namespace.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        assign(tree, key, value)
    }
}

fn merge_into(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(key) {
                    Some(existing) => merge_into(existing, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (_, Value::Null) => {}
        (base, overlay) => *base = overlay.clone(),
    }
}

fn lookup<'a>(tree: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.')
        .try_fold(tree, |node, segment| node.as_object()?.get(segment))
}

fn assign(tree: &mut Value, key: &str, value: Value) -> Result<(), StoreError> {
    let mut segments: Vec<&str> = key.split('.').collect();
    let Some(last) = segments.pop() else {
        return Err(StoreError::InvalidKey(key.to_string()));
    };

    let mut node = tree;
    for segment in segments {
        let object = node
            .as_object_mut()
            .ok_or_else(|| StoreError::InvalidKey(key.to_string()))?;
        node = object
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    node.as_object_mut()
        .ok_or_else(|| StoreError::InvalidKey(key.to_string()))?
        .insert(last.to_string(), value);
    Ok(())
}

/// Persistence service for [`RuntimeConfig`].
pub trait ConfigStore {
    /// Reads the current snapshot.
    fn load(&self) -> Result<RuntimeConfig, StoreError>;

    /// Sets a dotted key in a namespace's override layer and persists it.
    fn set_override(&self, namespace: &str, key: &str, value: Value) -> Result<(), StoreError>;
}

/// Stores the runtime configuration as pretty-printed JSON in a single file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Creates a store backed by `path`. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(STORE_LOCK_SUFFIX);
        PathBuf::from(name)
    }

    fn read(&self) -> Result<RuntimeConfig, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Ok(RuntimeConfig::default());
            }
            Err(err) => return Err(StoreError::ReadError(err)),
        };
        if contents.trim().is_empty() {
            return Ok(RuntimeConfig::default());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn write(&self, config: &RuntimeConfig) -> Result<(), StoreError> {
        let mut tmp = self.path.as_os_str().to_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, serde_json::to_string_pretty(config)?)
            .map_err(StoreError::WriteError)?;
        fs::rename(&tmp, &self.path).map_err(StoreError::WriteError)
    }

    /// Runs a read-modify-write cycle under an exclusive lock.
    fn update<F>(&self, mutate: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut RuntimeConfig) -> Result<(), StoreError>,
    {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(StoreError::WriteError)?;
        }

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())
            .map_err(StoreError::LockError)?;
        lock.lock_exclusive().map_err(StoreError::LockError)?;

        let result = self.read().and_then(|mut config| {
            mutate(&mut config)?;
            self.write(&config)
        });

        let _ = FileExt::unlock(&lock);
        result
    }
}

impl ConfigStore for FileStore {
    fn load(&self) -> Result<RuntimeConfig, StoreError> {
        self.read()
    }

    fn set_override(&self, namespace: &str, key: &str, value: Value) -> Result<(), StoreError> {
        debug!(
            "Setting override {namespace}.{key} = {value} in {}",
            self.path.display()
        );
        self.update(|config| config.set_override(namespace, key, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("program.rt.json"));

        let config = store.load().unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.get("couchdb", "httpd.port"), None);
    }

    #[test]
    fn override_takes_precedence_over_default() {
        let config: RuntimeConfig = serde_json::from_value(json!({
            "default": { "couchdb": { "httpd": { "port": 5984, "bind_address": "127.0.0.1" } } },
            "override": { "couchdb": { "httpd": { "port": 6001 } } }
        }))
        .unwrap();

        assert_eq!(config.get("couchdb", "httpd.port"), Some(json!(6001)));
        assert_eq!(
            config.get("couchdb", "httpd.bind_address"),
            Some(json!("127.0.0.1"))
        );
        assert_eq!(config.get_override("couchdb", "httpd.bind_address"), None);
    }

    #[test]
    fn null_override_falls_back_to_default() {
        let config: RuntimeConfig = serde_json::from_value(json!({
            "default": { "couchdb": { "httpd": { "port": 5984 } } },
            "override": { "couchdb": { "httpd": { "port": null } } }
        }))
        .unwrap();

        assert_eq!(config.get("couchdb", "httpd.port"), Some(json!(5984)));
        assert_eq!(config.get_override("couchdb", "httpd.port"), None);
    }

    #[test]
    fn set_override_persists_and_preserves_other_namespaces() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".rt/program.rt.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            r#"{ "default": { "app": { "name": "demo" } }, "override": {} }"#,
        )
        .unwrap();
        let store = FileStore::new(&path);

        store
            .set_override("couchdb", "httpd.port", json!(6123))
            .unwrap();

        let reloaded = FileStore::new(&path).load().unwrap();
        assert_eq!(reloaded.get("couchdb", "httpd.port"), Some(json!(6123)));
        assert_eq!(reloaded.get("app", "name"), Some(json!("demo")));
    }

    #[test]
    fn set_override_creates_parent_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/.rt/program.rt.json");
        let store = FileStore::new(&path);

        store.set_override("couchdb", "httpd.port", json!(7000)).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn set_override_rejects_scalar_intermediate() {
        let mut config = RuntimeConfig::default();
        config
            .set_override("couchdb", "httpd", json!("scalar"))
            .unwrap();

        assert!(matches!(
            config.set_override("couchdb", "httpd.port", json!(1)),
            Err(StoreError::InvalidKey(_))
        ));
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("program.rt.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            FileStore::new(&path).load(),
            Err(StoreError::ParseError(_))
        ));
    }
}
