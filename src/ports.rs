//! Local port registry: stable per-application ports on a developer machine.
//!
//! The registry is a JSON file (`~/.ports.json` by default) mapping a port
//! number to `{ "name": ..., ...metadata }`. An unseen application name gets
//! the port one above the highest registered port (or above the base port for
//! an empty registry).
//!
//! Ports are not checked for availability, and there is no locking: two
//! processes registering new names at the same moment may pick the same port.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::environment::{Environment, PORTS_HOME};
use crate::error::ConfigError;

/// File name of the registry inside the registry home directory.
pub const PORTS_FILE_NAME: &str = ".ports.json";

/// Ports are assigned strictly above this value.
pub const DEFAULT_BASE_PORT: u16 = 6000;

/// Source of stable fallback ports, keyed by application name.
pub trait PortRegistry {
    /// Return the port registered for `name`, registering a new one if needed.
    fn port_for(&self, name: &str) -> crate::Result<u16>;
}

/// One registered application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortRegistryEntry {
    pub port: u16,
    pub name: String,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

/// Registry persisted as a JSON file.
#[derive(Debug, Clone)]
pub struct JsonPortRegistry {
    path: PathBuf,
    base_port: u16,
}

impl JsonPortRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            base_port: DEFAULT_BASE_PORT,
        }
    }

    /// Locate the registry from `PORTSHOME`, else the user's home directory.
    pub fn from_environment(env: &Environment) -> Self {
        Self::new(ports_home(env).join(PORTS_FILE_NAME))
    }

    pub fn with_base_port(mut self, base_port: u16) -> Self {
        self.base_port = base_port;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Registered entries in ascending port order.
    pub fn entries(&self) -> Vec<PortRegistryEntry> {
        let mut entries: Vec<PortRegistryEntry> = self
            .read_map()
            .into_iter()
            .filter_map(|(key, value)| {
                let port = key.parse::<u16>().ok()?;
                let Value::Object(mut metadata) = value else {
                    return None;
                };
                let name = match metadata.remove("name") {
                    Some(Value::String(name)) => name,
                    _ => String::new(),
                };
                Some(PortRegistryEntry {
                    port,
                    name,
                    metadata,
                })
            })
            .collect();
        entries.sort_by_key(|e| e.port);
        entries
    }

    /// Like [`PortRegistry::port_for`], attaching `metadata` to a new entry.
    ///
    /// Metadata is ignored when `name` is already registered.
    pub fn register(&self, name: &str, metadata: Map<String, Value>) -> crate::Result<u16> {
        let entries = self.entries();
        if let Some(existing) = entries.iter().find(|e| e.name == name) {
            tracing::debug!(name, port = existing.port, "port registry hit");
            return Ok(existing.port);
        }

        let max_port = entries
            .iter()
            .map(|e| e.port)
            .fold(self.base_port, u16::max);
        let port = max_port.checked_add(1).ok_or_else(|| {
            ConfigError::PortRegistry(self.path.clone(), "no ports left to assign".to_string())
        })?;

        let mut record = metadata;
        record.insert("name".to_string(), Value::String(name.to_string()));
        let mut map = self.read_map();
        map.insert(port.to_string(), Value::Object(record));
        self.write_map(&map)?;

        tracing::info!(name, port, path = %self.path.display(), "registered new local port");
        Ok(port)
    }

    /// Missing or unreadable registries read as empty.
    fn read_map(&self) -> Map<String, Value> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return Map::new(),
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                tracing::warn!(path = %self.path.display(), "port registry is not a JSON object; treating as empty");
                Map::new()
            }
        }
    }

    /// Write to `<path>.tmp` then rename over the registry.
    fn write_map(&self, map: &Map<String, Value>) -> crate::Result<()> {
        let to_registry_err = |e: &dyn std::fmt::Display| {
            ConfigError::PortRegistry(self.path.clone(), e.to_string())
        };
        let body = serde_json::to_string(map).map_err(|e| to_registry_err(&e))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, body).map_err(|e| to_registry_err(&e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| to_registry_err(&e))?;
        Ok(())
    }
}

impl PortRegistry for JsonPortRegistry {
    fn port_for(&self, name: &str) -> crate::Result<u16> {
        self.register(name, Map::new())
    }
}

/// Directory holding the registry file.
///
/// `PORTSHOME` wins whenever it is set; otherwise the OS home variable, then
/// the platform home directory, then a literal `~`.
pub fn ports_home(env: &Environment) -> PathBuf {
    let var = if env.get(PORTS_HOME).is_some() {
        PORTS_HOME
    } else {
        Environment::home_var()
    };
    env.non_empty(var)
        .map(PathBuf::from)
        .or_else(|| (var != PORTS_HOME).then(dirs::home_dir).flatten())
        .unwrap_or_else(|| PathBuf::from("~"))
}
