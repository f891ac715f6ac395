//! Environment resolution. Decides app identity, services, name, port, bind
//! address and URLs, in that order, from an explicit set of inputs.
//!
//! Precedence rules:
//! - platform-hosted (valid `VCAP_APPLICATION` JSON): platform values are used verbatim
//! - local: override documents apply, then local defaults
//! - present-but-malformed platform JSON is fatal, malformed override files are not

use std::path::PathBuf;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::app_env::AppEnv;
use crate::environment::{Environment, VCAP_APPLICATION, VCAP_SERVICES};
use crate::error::ConfigError;
use crate::model::{App, Services, Vcap};
use crate::ports::{JsonPortRegistry, PortRegistry};
use crate::workspace::{FsWorkspace, Lookup, MANIFEST_FILE, Workspace};

/// Port used when nothing is advertised and no application name is known.
pub const DEFAULT_PORT: u16 = 3000;

/// Caller-supplied overrides.
///
/// Also loadable from a TOML file:
///
/// ```toml
/// vcap_file = "vcap-local.json"
/// name = "orders"
/// protocol = "http"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Options {
    /// JSON override document, consulted only when running locally.
    pub vcap_file: Option<PathBuf>,
    /// Override document supplied in memory; a readable `vcap_file` replaces it.
    #[serde(default)]
    pub vcap: Option<Vcap>,
    /// Application name, taking precedence over every other source.
    pub name: Option<String>,
    /// URL scheme for `urls`, e.g. `"http"`.
    pub protocol: Option<String>,
}

impl Options {
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Resolves an [`AppEnv`] from an environment and its file/port collaborators.
pub struct Resolver<W, P> {
    env: Environment,
    workspace: W,
    ports: P,
}

impl Resolver<FsWorkspace, JsonPortRegistry> {
    /// Resolver over the real process environment, working directory and
    /// home-directory port registry.
    pub fn from_process() -> Self {
        let env = Environment::from_process();
        let ports = JsonPortRegistry::from_environment(&env);
        Self::new(env, FsWorkspace::current_dir(), ports)
    }
}

impl<W: Workspace, P: PortRegistry> Resolver<W, P> {
    pub fn new(env: Environment, workspace: W, ports: P) -> Self {
        Self {
            env,
            workspace,
            ports,
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Resolve the full application environment.
    pub fn resolve(&self, options: &Options) -> crate::Result<AppEnv> {
        let is_local = is_local(&self.env);

        let vcap = if is_local {
            self.local_override(options)
        } else {
            None
        };

        let app = resolve_app(
            is_local,
            self.env.non_empty(VCAP_APPLICATION),
            vcap.as_ref().and_then(|v| v.application.as_ref()),
        )
        .inspect_err(|e| tracing::error!(error = %e, "resolution failed"))?;
        let services = resolve_services(
            is_local,
            self.env.non_empty(VCAP_SERVICES),
            vcap.as_ref().and_then(|v| v.services.as_ref()),
        )
        .inspect_err(|e| tracing::error!(error = %e, "resolution failed"))?;
        let name = resolve_name(options.name.as_deref(), &app, &self.workspace)?;
        let port = resolve_port(&self.env, &name, &self.ports)
            .inspect_err(|e| tracing::error!(error = %e, "resolution failed"))?;
        let bind = resolve_bind(&app);
        let urls = resolve_urls(is_local, &app, port, options.protocol.as_deref());

        tracing::debug!(is_local, name = %name, port, bind = %bind, "resolved app environment");

        Ok(AppEnv::new(is_local, app, services, name, port, bind, urls))
    }

    /// Override document for local runs: the file if readable, else `options.vcap`.
    fn local_override(&self, options: &Options) -> Option<Vcap> {
        let Some(path) = options.vcap_file.as_deref() else {
            return options.vcap.clone();
        };
        match self.workspace.read_vcap_file(path) {
            Lookup::Found(vcap) => Some(vcap),
            Lookup::NotFound => {
                tracing::warn!(path = %path.display(), "vcap file not found; ignoring");
                options.vcap.clone()
            }
            Lookup::Invalid { path, message } => {
                tracing::warn!(path = %path.display(), error = %message, "error reading vcap file; ignoring");
                options.vcap.clone()
            }
        }
    }
}

/// Local unless `VCAP_APPLICATION` holds valid JSON.
pub fn is_local(env: &Environment) -> bool {
    env.get(VCAP_APPLICATION)
        .is_none_or(|raw| serde_json::from_str::<serde_json::Value>(raw).is_err())
}

/// Shared precedence rule for the platform JSON variables.
///
/// Only text that is not JSON at all is fatal. A document of an unexpected
/// shape is converted leniently, falling back to `T::default()`.
fn resolve_platform_json<T: DeserializeOwned + Clone + Default>(
    var: &str,
    is_local: bool,
    env_raw: Option<&str>,
    override_value: Option<&T>,
) -> crate::Result<Option<T>> {
    let Some(raw) = env_raw else {
        return Ok(None);
    };
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|_| ConfigError::InvalidEnvJson {
            var: var.to_string(),
            value: raw.to_string(),
        })?;
    if is_local {
        if let Some(local) = override_value {
            return Ok(Some(local.clone()));
        }
    }
    let parsed = serde_json::from_value(value).unwrap_or_else(|e| {
        tracing::warn!(var, error = %e, "unexpected document shape; using defaults");
        T::default()
    });
    Ok(Some(parsed))
}

/// Application identity from `VCAP_APPLICATION`, an override, or the local default.
pub fn resolve_app(
    is_local: bool,
    env_raw: Option<&str>,
    override_app: Option<&App>,
) -> crate::Result<App> {
    Ok(resolve_platform_json(VCAP_APPLICATION, is_local, env_raw, override_app)?
        .unwrap_or_else(App::local_default))
}

/// Bound services from `VCAP_SERVICES`, an override, or none.
pub fn resolve_services(
    is_local: bool,
    env_raw: Option<&str>,
    override_services: Option<&Services>,
) -> crate::Result<Services> {
    Ok(
        resolve_platform_json(VCAP_SERVICES, is_local, env_raw, override_services)?
            .unwrap_or_default(),
    )
}

/// Application name: explicit override, platform name, manifest, package
/// descriptor, then empty.
pub fn resolve_name(
    override_name: Option<&str>,
    app: &App,
    workspace: &impl Workspace,
) -> crate::Result<String> {
    if let Some(name) = override_name.filter(|n| !n.is_empty()) {
        return Ok(name.to_string());
    }
    if !app.name.is_empty() {
        return Ok(app.name.clone());
    }

    match workspace.manifest_app_name() {
        Lookup::Found(Some(name)) => return Ok(name),
        Lookup::Found(None) | Lookup::NotFound => {}
        Lookup::Invalid { path, message } => {
            tracing::error!(path = %path.display(), error = %message, "invalid {MANIFEST_FILE}");
            return Err(ConfigError::InvalidManifest(path, message));
        }
    }

    match workspace.package_name() {
        Lookup::Found(name) => Ok(name.unwrap_or_default()),
        Lookup::NotFound => Ok(String::new()),
        Lookup::Invalid { path, message } => {
            tracing::debug!(path = %path.display(), error = %message, "unparsable package descriptor; ignoring");
            Ok(String::new())
        }
    }
}

/// Listening port: advertised port variables, else [`DEFAULT_PORT`] for an
/// unnamed app, else the local registry's port for `name`.
pub fn resolve_port(
    env: &Environment,
    name: &str,
    registry: &impl PortRegistry,
) -> crate::Result<u16> {
    match env.advertised_port() {
        Some(raw) => leading_integer(raw)
            .and_then(|n| u16::try_from(n).ok())
            .ok_or_else(|| ConfigError::InvalidPort(raw.to_string())),
        None if name.is_empty() => Ok(DEFAULT_PORT),
        None => registry.port_for(name),
    }
}

/// Integer prefix of `raw` after leading whitespace, with an optional sign.
///
/// Trailing text is ignored (`"8080abc"` reads as 8080); `None` when no digit
/// follows the sign.
fn leading_integer(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    // Anything past i64 is out of port range anyway.
    let magnitude = rest[..digits].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

/// Bind address: the app host, or `localhost`.
pub fn resolve_bind(app: &App) -> String {
    if app.host.is_empty() {
        "localhost".to_string()
    } else {
        app.host.clone()
    }
}

/// Externally reachable URLs, one per route.
pub fn resolve_urls(is_local: bool, app: &App, port: u16, protocol: Option<&str>) -> Vec<String> {
    let hosts = if is_local {
        vec![format!("localhost:{port}")]
    } else if app.uris.is_empty() {
        vec!["localhost".to_string()]
    } else {
        app.uris.clone()
    };

    let protocol = match protocol.map(|p| p.trim_end_matches(':')) {
        Some(p) if !p.is_empty() => p,
        _ if is_local => "http",
        _ => "https",
    };

    hosts
        .into_iter()
        .map(|host| format!("{protocol}://{host}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::PORTS_FILE_NAME;
    use std::cell::RefCell;
    use std::path::Path;
    use tempfile::TempDir;

    /// In-memory workspace recording nothing but canned answers.
    #[derive(Default)]
    struct FakeWorkspace {
        manifest: Option<Lookup<Option<String>>>,
        package: Option<Lookup<Option<String>>>,
        vcap: Option<Lookup<Vcap>>,
    }

    impl Workspace for FakeWorkspace {
        fn manifest_app_name(&self) -> Lookup<Option<String>> {
            self.manifest.clone().unwrap_or(Lookup::NotFound)
        }

        fn package_name(&self) -> Lookup<Option<String>> {
            self.package.clone().unwrap_or(Lookup::NotFound)
        }

        fn read_vcap_file(&self, _path: &Path) -> Lookup<Vcap> {
            self.vcap.clone().unwrap_or(Lookup::NotFound)
        }
    }

    /// Registry that hands out a fixed port and records who asked.
    struct FixedPorts {
        port: u16,
        asked: RefCell<Vec<String>>,
    }

    impl FixedPorts {
        fn new(port: u16) -> Self {
            Self {
                port,
                asked: RefCell::new(Vec::new()),
            }
        }
    }

    impl PortRegistry for FixedPorts {
        fn port_for(&self, name: &str) -> crate::Result<u16> {
            self.asked.borrow_mut().push(name.to_string());
            Ok(self.port)
        }
    }

    const PLATFORM_APP: &str = r#"{"name": "orders", "host": "0.0.0.0", "uris": ["orders.apps.example.com", "orders.example.com"], "instance_index": 0}"#;
    const PLATFORM_SERVICES: &str = r#"{"p-mysql": [{"name": "orders-db", "credentials": {"uri": "mysql://u:p@db:3306/orders"}}]}"#;

    fn app_named(name: &str) -> App {
        App {
            name: name.to_string(),
            ..App::default()
        }
    }

    #[test]
    fn test_is_local() {
        assert!(is_local(&Environment::new()));
        assert!(is_local(&Environment::new().with_var(VCAP_APPLICATION, "")));
        assert!(is_local(&Environment::new().with_var(VCAP_APPLICATION, "{nope")));
        assert!(!is_local(&Environment::new().with_var(VCAP_APPLICATION, "{}")));
    }

    #[test]
    fn test_resolve_app_absent_is_default() {
        let app = resolve_app(true, None, None).unwrap();
        assert_eq!(app, App::local_default());
        assert_eq!(app.uris, vec!["localhost"]);
    }

    #[test]
    fn test_resolve_app_platform_ignores_override() {
        let over = app_named("override");
        let app = resolve_app(false, Some(PLATFORM_APP), Some(&over)).unwrap();
        assert_eq!(app.name, "orders");
    }

    #[test]
    fn test_resolve_app_local_prefers_override() {
        let over = app_named("override");
        let app = resolve_app(true, Some(PLATFORM_APP), Some(&over)).unwrap();
        assert_eq!(app.name, "override");

        let app = resolve_app(true, Some(PLATFORM_APP), None).unwrap();
        assert_eq!(app.name, "orders");
    }

    #[test]
    fn test_resolve_app_malformed_is_fatal() {
        let over = app_named("override");
        let err = resolve_app(true, Some("not-json"), Some(&over)).unwrap_err();
        assert!(matches!(&err, ConfigError::InvalidEnvJson { var, value }
            if var == VCAP_APPLICATION && value == "not-json"));
        assert!(err.to_string().contains("not-json"));
    }

    #[test]
    fn test_resolve_app_unexpected_shape_is_not_fatal() {
        let raw = r#"{"name": null, "uris": ["orders.example.com"]}"#;
        let app = resolve_app(false, Some(raw), None).unwrap();
        assert_eq!(app.name, "");
        assert_eq!(app.uris, vec!["orders.example.com"]);

        let app = resolve_app(false, Some("42"), None).unwrap();
        assert_eq!(app, App::default());
    }

    #[test]
    fn test_resolve_services_nameless_binding() {
        let raw = r#"{"user-provided": [{"credentials": {"url": "http://h"}}]}"#;
        let services = resolve_services(false, Some(raw), None).unwrap();
        assert_eq!(services.get("user-provided").unwrap()[0].name, "");

        let services = resolve_services(false, Some("[1, 2]"), None).unwrap();
        assert!(services.is_empty());
    }

    #[test]
    fn test_resolve_services_rules() {
        assert!(resolve_services(true, None, None).unwrap().is_empty());

        let over = Services::new().with_group("local", vec![]);
        let services = resolve_services(true, Some(PLATFORM_SERVICES), Some(&over)).unwrap();
        assert_eq!(services, over);

        let services = resolve_services(false, Some(PLATFORM_SERVICES), Some(&over)).unwrap();
        assert!(services.get("p-mysql").is_some());

        let err = resolve_services(false, Some("[1,"), None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvJson { var, .. } if var == VCAP_SERVICES));
    }

    #[test]
    fn test_resolve_services_override_needs_env_var() {
        let over = Services::new().with_group("local", vec![]);
        assert!(resolve_services(true, None, Some(&over)).unwrap().is_empty());
    }

    #[test]
    fn test_resolve_port_default_without_name() {
        let ports = FixedPorts::new(6001);
        assert_eq!(resolve_port(&Environment::new(), "", &ports).unwrap(), 3000);
        assert!(ports.asked.borrow().is_empty());
    }

    #[test]
    fn test_resolve_port_env_wins() {
        let ports = FixedPorts::new(6001);
        let env = Environment::new()
            .with_var("CF_INSTANCE_PORT", "61000")
            .with_var("PORT", "8080");
        assert_eq!(resolve_port(&env, "orders", &ports).unwrap(), 8080);
        assert!(ports.asked.borrow().is_empty());
    }

    #[test]
    fn test_resolve_port_uses_registry_for_named_app() {
        let ports = FixedPorts::new(6042);
        assert_eq!(resolve_port(&Environment::new(), "orders", &ports).unwrap(), 6042);
        assert_eq!(*ports.asked.borrow(), vec!["orders".to_string()]);
    }

    #[test]
    fn test_resolve_port_registry_mints_next_port() {
        let dir = TempDir::new().unwrap();
        let registry = JsonPortRegistry::new(dir.path().join(PORTS_FILE_NAME));
        std::fs::write(registry.path(), r#"{"6010": {"name": "other"}}"#).unwrap();
        assert_eq!(resolve_port(&Environment::new(), "orders", &registry).unwrap(), 6011);
    }

    #[test]
    fn test_resolve_port_invalid() {
        let ports = FixedPorts::new(6001);
        let env = Environment::new().with_var("PORT", "http");
        let err = resolve_port(&env, "orders", &ports).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort(v) if v == "http"));

        let env = Environment::new().with_var("PORT", "70000");
        assert!(resolve_port(&env, "orders", &ports).is_err());

        let env = Environment::new().with_var("PORT", "-80");
        assert!(resolve_port(&env, "orders", &ports).is_err());
    }

    #[test]
    fn test_resolve_port_reads_leading_integer() {
        let ports = FixedPorts::new(6001);
        for (raw, expected) in [("8080abc", 8080), (" 80", 80), ("+443", 443), ("5000.5", 5000)] {
            let env = Environment::new().with_var("PORT", raw);
            assert_eq!(resolve_port(&env, "orders", &ports).unwrap(), expected, "{raw:?}");
        }
        assert!(ports.asked.borrow().is_empty());
    }

    #[test]
    fn test_leading_integer() {
        assert_eq!(leading_integer("42"), Some(42));
        assert_eq!(leading_integer("\t-7x"), Some(-7));
        assert_eq!(leading_integer("99999999999999999999999"), Some(i64::MAX));
        assert_eq!(leading_integer(""), None);
        assert_eq!(leading_integer("-"), None);
        assert_eq!(leading_integer("x1"), None);
    }

    #[test]
    fn test_resolve_bind() {
        assert_eq!(resolve_bind(&App::default()), "localhost");
        let app = App {
            host: "0.0.0.0".to_string(),
            ..App::default()
        };
        assert_eq!(resolve_bind(&app), "0.0.0.0");
    }

    #[test]
    fn test_resolve_name_precedence() {
        let ws = FakeWorkspace {
            manifest: Some(Lookup::Found(Some("from-manifest".into()))),
            package: Some(Lookup::Found(Some("from-package".into()))),
            ..FakeWorkspace::default()
        };
        let app = app_named("from-app");
        assert_eq!(resolve_name(Some("explicit"), &app, &ws).unwrap(), "explicit");
        assert_eq!(resolve_name(None, &app, &ws).unwrap(), "from-app");
        assert_eq!(resolve_name(None, &App::default(), &ws).unwrap(), "from-manifest");

        let ws = FakeWorkspace {
            manifest: Some(Lookup::Found(None)),
            package: Some(Lookup::Found(Some("from-package".into()))),
            ..FakeWorkspace::default()
        };
        assert_eq!(resolve_name(None, &App::default(), &ws).unwrap(), "from-package");

        assert_eq!(
            resolve_name(None, &App::default(), &FakeWorkspace::default()).unwrap(),
            ""
        );
    }

    #[test]
    fn test_resolve_name_package_parse_error_swallowed() {
        let ws = FakeWorkspace {
            package: Some(Lookup::Invalid {
                path: "package.json".into(),
                message: "EOF".into(),
            }),
            ..FakeWorkspace::default()
        };
        assert_eq!(resolve_name(None, &App::default(), &ws).unwrap(), "");
    }

    #[test]
    fn test_resolve_name_invalid_manifest_is_fatal() {
        let ws = FakeWorkspace {
            manifest: Some(Lookup::Invalid {
                path: "manifest.yml".into(),
                message: "bad indent".into(),
            }),
            ..FakeWorkspace::default()
        };
        let err = resolve_name(None, &App::default(), &ws).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidManifest(_, _)));
    }

    #[test]
    fn test_resolve_urls_local() {
        let urls = resolve_urls(true, &App::default(), 4000, None);
        assert_eq!(urls, vec!["http://localhost:4000"]);

        let app = App {
            uris: vec!["orders.example.com".into()],
            ..App::default()
        };
        assert_eq!(resolve_urls(true, &app, 4000, None), vec!["http://localhost:4000"]);
    }

    #[test]
    fn test_resolve_urls_platform() {
        let app = App {
            uris: vec!["a.example.com".into(), "b.example.com".into()],
            ..App::default()
        };
        assert_eq!(
            resolve_urls(false, &app, 8080, None),
            vec!["https://a.example.com", "https://b.example.com"]
        );
        assert_eq!(
            resolve_urls(false, &App::default(), 8080, None),
            vec!["https://localhost"]
        );
    }

    #[test]
    fn test_resolve_urls_protocol_override() {
        let app = App {
            uris: vec!["a.example.com".into()],
            ..App::default()
        };
        assert_eq!(resolve_urls(false, &app, 1, Some("http:")), vec!["http://a.example.com"]);
        assert_eq!(resolve_urls(true, &app, 5000, Some("ws")), vec!["ws://localhost:5000"]);
    }

    #[test]
    fn test_resolver_platform_end_to_end() {
        let env = Environment::new()
            .with_var(VCAP_APPLICATION, PLATFORM_APP)
            .with_var(VCAP_SERVICES, PLATFORM_SERVICES)
            .with_var("PORT", "8080");
        let resolver = Resolver::new(env, FakeWorkspace::default(), FixedPorts::new(1));
        let app_env = resolver.resolve(&Options::default()).unwrap();

        assert!(!app_env.is_local());
        assert_eq!(app_env.name(), "orders");
        assert_eq!(app_env.port(), 8080);
        assert_eq!(app_env.bind(), "0.0.0.0");
        assert_eq!(
            app_env.urls(),
            ["https://orders.apps.example.com", "https://orders.example.com"]
        );
        assert_eq!(app_env.url(), Some("https://orders.apps.example.com"));
        assert!(app_env.get_service(&"orders-db".into()).is_some());
    }

    #[test]
    fn test_resolver_local_defaults() {
        let ports = FixedPorts::new(6007);
        let resolver = Resolver::new(Environment::new(), FakeWorkspace::default(), ports);
        let app_env = resolver.resolve(&Options::default()).unwrap();

        assert!(app_env.is_local());
        assert_eq!(app_env.name(), "ignoreme");
        assert_eq!(app_env.port(), 6007);
        assert_eq!(app_env.bind(), "localhost");
        assert_eq!(app_env.url(), Some("http://localhost:6007"));
        assert!(app_env.services().is_empty());
    }

    #[test]
    fn test_resolver_local_uses_vcap_file_services() {
        let vcap: Vcap = serde_json::from_str(
            r#"{"services": {"user-provided": [{"name": "local-db", "credentials": {"url": "http://localhost/db"}}]}}"#,
        )
        .unwrap();
        let ws = FakeWorkspace {
            vcap: Some(Lookup::Found(vcap)),
            ..FakeWorkspace::default()
        };
        let env = Environment::new()
            .with_var(VCAP_SERVICES, PLATFORM_SERVICES)
            .with_var("PORT", "5000");
        let options = Options {
            vcap_file: Some("vcap-local.json".into()),
            ..Options::default()
        };
        let app_env = Resolver::new(env, ws, FixedPorts::new(1))
            .resolve(&options)
            .unwrap();

        assert!(app_env.get_service(&"local-db".into()).is_some());
        assert!(app_env.get_service(&"orders-db".into()).is_none());
    }

    #[test]
    fn test_resolver_bad_vcap_file_ignored() {
        let ws = FakeWorkspace {
            vcap: Some(Lookup::Invalid {
                path: "vcap-local.json".into(),
                message: "expected value".into(),
            }),
            ..FakeWorkspace::default()
        };
        let env = Environment::new().with_var(VCAP_SERVICES, PLATFORM_SERVICES);
        let options = Options {
            vcap_file: Some("vcap-local.json".into()),
            name: Some("orders".into()),
            ..Options::default()
        };
        let app_env = Resolver::new(env, ws, FixedPorts::new(6001))
            .resolve(&options)
            .unwrap();
        assert!(app_env.get_service(&"orders-db".into()).is_some());
        assert_eq!(app_env.name(), "orders");
    }

    #[test]
    fn test_resolver_platform_ignores_vcap_file() {
        let vcap: Vcap = serde_json::from_str(r#"{"services": {}}"#).unwrap();
        let ws = FakeWorkspace {
            vcap: Some(Lookup::Found(vcap)),
            ..FakeWorkspace::default()
        };
        let env = Environment::new()
            .with_var(VCAP_APPLICATION, PLATFORM_APP)
            .with_var(VCAP_SERVICES, PLATFORM_SERVICES)
            .with_var("PORT", "8080");
        let options = Options {
            vcap_file: Some("vcap-local.json".into()),
            ..Options::default()
        };
        let app_env = Resolver::new(env, ws, FixedPorts::new(1))
            .resolve(&options)
            .unwrap();
        assert!(app_env.get_service(&"orders-db".into()).is_some());
    }

    #[test]
    fn test_resolver_platform_with_null_fields() {
        let env = Environment::new()
            .with_var(VCAP_APPLICATION, r#"{"name": null, "host": null, "uris": ["a.example.com"]}"#)
            .with_var("PORT", "8080");
        let options = Options {
            name: Some("orders".into()),
            ..Options::default()
        };
        let app_env = Resolver::new(env, FakeWorkspace::default(), FixedPorts::new(1))
            .resolve(&options)
            .unwrap();
        assert!(!app_env.is_local());
        assert_eq!(app_env.name(), "orders");
        assert_eq!(app_env.bind(), "localhost");
        assert_eq!(app_env.url(), Some("https://a.example.com"));
    }

    #[test]
    fn test_resolver_malformed_services_aborts() {
        let env = Environment::new().with_var(VCAP_SERVICES, "{oops");
        let result = Resolver::new(env, FakeWorkspace::default(), FixedPorts::new(1))
            .resolve(&Options::default());
        assert!(matches!(result, Err(ConfigError::InvalidEnvJson { .. })));
    }

    #[test]
    fn test_options_from_toml() {
        let options = Options::from_toml_str(
            r#"
            vcap_file = "vcap-local.json"
            name = "orders"
            protocol = "http"
            "#,
        )
        .unwrap();
        assert_eq!(options.vcap_file, Some(PathBuf::from("vcap-local.json")));
        assert_eq!(options.name.as_deref(), Some("orders"));
        assert_eq!(options.protocol.as_deref(), Some("http"));
        assert!(options.vcap.is_none());
    }
}
