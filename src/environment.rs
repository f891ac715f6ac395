//! Explicit environment-variable input for resolution.
//!
//! Resolution never reads process state directly. Callers build an
//! [`Environment`] (usually via [`Environment::from_process`]) and pass it in,
//! which keeps every resolver a pure function of its inputs.

use std::collections::HashMap;

/// Platform application identity JSON.
pub const VCAP_APPLICATION: &str = "VCAP_APPLICATION";
/// Platform bound-services JSON.
pub const VCAP_SERVICES: &str = "VCAP_SERVICES";
/// Port variables, in priority order.
pub const PORT_VARS: [&str; 3] = ["PORT", "CF_INSTANCE_PORT", "VCAP_APP_PORT"];
/// Overrides the directory holding the local port registry.
pub const PORTS_HOME: &str = "PORTSHOME";

/// Snapshot of environment variables consulted during resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Create an empty environment (a developer machine with nothing set).
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the current process environment.
    ///
    /// Variables whose name or value is not valid Unicode are skipped.
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        }
    }

    /// Builder-style setter, mostly for tests and embedding.
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Raw value of a variable, including the empty string.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Value of a variable, treating the empty string as unset.
    pub fn non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.is_empty())
    }

    /// First non-empty port variable in [`PORT_VARS`] order.
    pub fn advertised_port(&self) -> Option<&str> {
        PORT_VARS.iter().find_map(|var| self.non_empty(var))
    }

    /// Name of the variable holding the user's home directory on this OS.
    pub fn home_var() -> &'static str {
        if cfg!(windows) { "USERPROFILE" } else { "HOME" }
    }
}

impl<K, V> FromIterator<(K, V)> for Environment
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
