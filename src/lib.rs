//! cfenv: Cloud Foundry application environment discovery.
//! Resolves app identity, bound services, port, bind address and URLs from the
//! platform's environment variables, falling back to local-development
//! defaults and a per-user registry of stable local ports.

pub mod app_env;
pub mod environment;
pub mod error;
pub mod model;
pub mod ports;
pub mod resolver;
pub mod server;
pub mod services;
pub mod url_builder;
pub mod workspace;

pub use app_env::AppEnv;
pub use environment::Environment;
pub use error::{ConfigError, Result};
pub use model::{App, Credentials, Service, Services, Vcap};
pub use ports::{JsonPortRegistry, PortRegistry, PortRegistryEntry};
pub use resolver::{Options, Resolver};
pub use server::{DumpSample, generate_dump, serve_dump};
pub use services::{ServiceDirectory, ServiceSpec};
pub use url_builder::{Replacement, Replacements, build_url};
pub use workspace::{FsWorkspace, Lookup, Workspace};

/// Resolve the application environment from the current process.
pub fn get_app_env(options: &Options) -> Result<AppEnv> {
    AppEnv::from_process(options)
}
