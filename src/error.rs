//! Error types for app environment resolution.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for cfenv operations.
///
/// Every variant aborts resolution: there is no partially resolved `AppEnv`.
/// Recoverable problems (a bad override file, an unparsable `package.json`)
/// never surface here, they are logged where they occur.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A platform environment variable is present but is not JSON
    #[error("cfenv: env var {var} is not JSON: {value}")]
    InvalidEnvJson { var: String, value: String },

    /// The advertised port has no leading base-10 integer, or it is outside TCP range
    #[error("cfenv: invalid PORT value: {0}")]
    InvalidPort(String),

    /// `manifest.yml` exists but is not valid YAML
    #[error("cfenv: invalid manifest '{}': {}", .0.display(), .1)]
    InvalidManifest(PathBuf, String),

    /// The local port registry could not be written
    #[error("cfenv: port registry '{}': {}", .0.display(), .1)]
    PortRegistry(PathBuf, String),

    /// Resolved environment could not be serialized
    #[error("cfenv: serialization failed: {0}")]
    Serialize(String),

    /// Dump server could not bind or serve
    #[error("cfenv: io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for cfenv operations
pub type Result<T> = std::result::Result<T, ConfigError>;
