//! The resolved application environment: a read-only snapshot plus the
//! service query surface built on top of it.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::{App, Credentials, Service, Services};
use crate::resolver::{Options, Resolver};
use crate::services::{ServiceDirectory, ServiceSpec};
use crate::url_builder::{Replacements, build_url};

/// Configuration discovered once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppEnv {
    is_local: bool,
    app: App,
    services: Services,
    name: String,
    port: u16,
    bind: String,
    urls: Vec<String>,
    url: Option<String>,
}

impl AppEnv {
    pub(crate) fn new(
        is_local: bool,
        app: App,
        services: Services,
        name: String,
        port: u16,
        bind: String,
        urls: Vec<String>,
    ) -> Self {
        let url = urls.first().cloned();
        Self {
            is_local,
            app,
            services,
            name,
            port,
            bind,
            urls,
            url,
        }
    }

    /// Resolve from the process environment, working directory and the
    /// user's port registry.
    pub fn from_process(options: &Options) -> crate::Result<Self> {
        Resolver::from_process().resolve(options)
    }

    pub fn is_local(&self) -> bool {
        self.is_local
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn bind(&self) -> &str {
        &self.bind
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// First entry of [`AppEnv::urls`].
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// All bindings keyed by name.
    pub fn service_directory(&self) -> ServiceDirectory {
        ServiceDirectory::from_services(&self.services)
    }

    pub fn get_service(&self, spec: &ServiceSpec) -> Option<Service> {
        self.service_directory().find(spec).cloned()
    }

    /// Connection URL for a binding; `""` when unavailable.
    pub fn get_service_url(&self, spec: &ServiceSpec, replacements: &Replacements) -> String {
        build_url(&self.service_directory(), spec, replacements)
    }

    pub fn get_service_creds(&self, spec: &ServiceSpec) -> Option<Credentials> {
        self.service_directory().credentials(spec)
    }

    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> crate::Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }
}
