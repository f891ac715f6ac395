//! Optional files in the application's working directory.
//!
//! Every lookup reports one of three outcomes through [`Lookup`], so callers
//! decide explicitly whether a parse failure is fatal or just falls through.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::model::Vcap;

/// Deployment manifest consulted for the application name.
pub const MANIFEST_FILE: &str = "manifest.yml";
/// Package descriptor consulted for the application name.
pub const PACKAGE_FILE: &str = "package.json";

/// Outcome of reading and parsing an optional file.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    /// The file exists but could not be read or parsed.
    Invalid { path: PathBuf, message: String },
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Package {
    #[serde(default)]
    name: Option<String>,
}

/// File-backed collaborators of the resolver.
pub trait Workspace {
    /// Name of the first application in the manifest, if it has one.
    fn manifest_app_name(&self) -> Lookup<Option<String>>;

    /// `name` from the package descriptor, if it has one.
    fn package_name(&self) -> Lookup<Option<String>>;

    /// Local override document.
    fn read_vcap_file(&self, path: &Path) -> Lookup<Vcap>;
}

/// [`Workspace`] rooted at a directory on disk.
#[derive(Debug, Clone)]
pub struct FsWorkspace {
    root: PathBuf,
}

impl FsWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Workspace at the process working directory.
    pub fn current_dir() -> Self {
        Self::new(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read(&self, path: &Path) -> Lookup<String> {
        match std::fs::read_to_string(path) {
            Ok(content) => Lookup::Found(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Lookup::NotFound,
            Err(e) => Lookup::Invalid {
                path: path.to_path_buf(),
                message: e.to_string(),
            },
        }
    }

    fn parse<T, E: std::fmt::Display>(
        &self,
        path: PathBuf,
        parse: impl FnOnce(&str) -> Result<T, E>,
    ) -> Lookup<T> {
        match self.read(&path) {
            Lookup::Found(content) => match parse(&content) {
                Ok(value) => Lookup::Found(value),
                Err(e) => Lookup::Invalid {
                    path,
                    message: e.to_string(),
                },
            },
            Lookup::NotFound => Lookup::NotFound,
            Lookup::Invalid { path, message } => Lookup::Invalid { path, message },
        }
    }
}

impl Workspace for FsWorkspace {
    fn manifest_app_name(&self) -> Lookup<Option<String>> {
        self.parse(self.root.join(MANIFEST_FILE), |s| {
            if s.trim().is_empty() {
                return Ok(None);
            }
            serde_yaml::from_str::<serde_yaml::Value>(s).map(|manifest| first_app_name(&manifest))
        })
    }

    fn package_name(&self) -> Lookup<Option<String>> {
        self.parse(self.root.join(PACKAGE_FILE), |s| {
            serde_json::from_str::<Package>(s).map(|p| p.name)
        })
    }

    fn read_vcap_file(&self, path: &Path) -> Lookup<Vcap> {
        self.parse(self.root.join(path), |s| serde_json::from_str::<Vcap>(s))
    }
}

/// `applications[0].name`, when every step has the expected shape.
fn first_app_name(manifest: &serde_yaml::Value) -> Option<String> {
    manifest
        .get("applications")?
        .as_sequence()?
        .first()?
        .get("name")?
        .as_str()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}
