//! cfenv: inspect the resolved Cloud Foundry app environment.
//!
//! Subcommands:
//! - `cfenv show`: resolved environment as JSON
//! - `cfenv services` / `cfenv creds` / `cfenv service-url`: service queries
//! - `cfenv port`: look up or assign a stable local port
//! - `cfenv serve`: HTTP server dumping the environment on every request

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use nimbus_cfenv::{
    AppEnv, DumpSample, Environment, JsonPortRegistry, Options, PortRegistry, Replacements,
    Resolver, ServiceSpec, serve_dump,
};
use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// cfenv: inspect the resolved Cloud Foundry app environment.
#[derive(Parser)]
#[command(
    name = "cfenv",
    version,
    about = "cfenv: inspect the resolved Cloud Foundry app environment"
)]
struct Cli {
    #[command(flatten)]
    options: OptionArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct OptionArgs {
    /// Path to cfenv.toml options file [default: ./cfenv.toml or ~/.config/cfenv/cfenv.toml]
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Local override document with `application` and `services`
    #[arg(long, global = true)]
    vcap_file: Option<PathBuf>,
    /// Application name override
    #[arg(long, global = true)]
    name: Option<String>,
    /// URL scheme for the app's URLs
    #[arg(long, global = true)]
    protocol: Option<String>,
}

#[derive(Args)]
struct SpecArgs {
    /// Service binding name, or a regular expression with --regex
    spec: String,
    /// Treat SPEC as a regular expression
    #[arg(long)]
    regex: bool,
}

impl SpecArgs {
    fn to_spec(&self) -> Result<ServiceSpec> {
        if self.regex {
            let re = Regex::new(&self.spec)
                .map_err(|e| anyhow::anyhow!("Invalid service pattern {:?}: {}", self.spec, e))?;
            Ok(ServiceSpec::Pattern(re))
        } else {
            Ok(ServiceSpec::Exact(self.spec.clone()))
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved environment as JSON
    Show,
    /// Print all service bindings keyed by name
    Services,
    /// Print a binding's credentials
    Creds {
        #[command(flatten)]
        spec: SpecArgs,
    },
    /// Print a connection URL built from a binding's credentials
    ServiceUrl {
        #[command(flatten)]
        spec: SpecArgs,
        /// Replacements as JSON, e.g. '{"auth": ["username", "password"]}'
        #[arg(long)]
        replace: Option<String>,
    },
    /// Look up or assign the local port for an application name
    Port {
        /// Application name
        app: String,
    },
    /// Serve a plain-text dump of the environment on the resolved bind/port
    Serve {
        /// Binding whose URL is shown in the dump [default: cf-env-test]
        #[arg(long)]
        sample_service: Option<String>,
        /// Replacements for the sample URL, as JSON
        #[arg(long)]
        sample_replace: Option<String>,
        /// Leave the sample service URL out of the dump
        #[arg(long, conflicts_with_all = ["sample_service", "sample_replace"])]
        no_sample: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with env filter (RUST_LOG controls verbosity)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Show => {
            let app_env = resolve_app_env(&cli.options).await?;
            println!("{}", app_env.to_json_pretty()?);
        }
        Commands::Services => {
            let app_env = resolve_app_env(&cli.options).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&app_env.service_directory())?
            );
        }
        Commands::Creds { spec } => {
            let app_env = resolve_app_env(&cli.options).await?;
            match app_env.get_service_creds(&spec.to_spec()?) {
                Some(creds) => println!("{}", serde_json::to_string_pretty(&creds)?),
                None => anyhow::bail!("No service matches {:?}", spec.spec),
            }
        }
        Commands::ServiceUrl { spec, replace } => {
            let replacements = parse_replacements(replace.as_deref())?;
            let app_env = resolve_app_env(&cli.options).await?;
            println!("{}", app_env.get_service_url(&spec.to_spec()?, &replacements));
        }
        Commands::Port { app } => {
            let registry = JsonPortRegistry::from_environment(&Environment::from_process());
            let port = registry
                .port_for(&app)
                .map_err(|e| anyhow::anyhow!("Failed to assign port for {}: {}", app, e))?;
            println!("{port}");
        }
        Commands::Serve {
            sample_service,
            sample_replace,
            no_sample,
        } => {
            let sample = if no_sample {
                None
            } else {
                let mut sample = DumpSample::default();
                if let Some(name) = sample_service {
                    sample.spec = ServiceSpec::Exact(name);
                }
                if sample_replace.is_some() {
                    sample.replacements = parse_replacements(sample_replace.as_deref())?;
                }
                Some(sample)
            };
            let app_env = resolve_app_env(&cli.options).await?;
            run_serve(app_env, sample).await?;
        }
    }

    Ok(())
}

/// Load options and resolve the environment of the current process.
async fn resolve_app_env(args: &OptionArgs) -> Result<AppEnv> {
    let options = load_options(args).await?;
    Resolver::from_process()
        .resolve(&options)
        .map_err(|e| anyhow::anyhow!("Failed to resolve app environment: {}", e))
}

/// Serve the environment dump until Ctrl-C.
async fn run_serve(app_env: AppEnv, sample: Option<DumpSample>) -> Result<()> {
    let cancel = CancellationToken::new();

    // Ctrl-C handler cancels the root token for graceful shutdown
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutting down cfenv server...");
        cancel_for_signal.cancel();
    });

    serve_dump(Arc::new(app_env), sample, cancel)
        .await
        .map_err(|e| anyhow::anyhow!("cfenv server error: {}", e))
}

fn parse_replacements(raw: Option<&str>) -> Result<Replacements> {
    match raw {
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| anyhow::anyhow!("Invalid replacements {:?}: {}", raw, e)),
        None => Ok(Replacements::new()),
    }
}

/// Options file + command-line flags; flags win.
async fn load_options(args: &OptionArgs) -> Result<Options> {
    let mut options = match resolve_config(args.config.clone())? {
        Some(path) => load_config(&path).await?,
        None => Options::default(),
    };
    if let Some(vcap_file) = &args.vcap_file {
        options.vcap_file = Some(vcap_file.clone());
    }
    if let Some(name) = &args.name {
        options.name = Some(name.clone());
    }
    if let Some(protocol) = &args.protocol {
        options.protocol = Some(protocol.clone());
    }
    Ok(options)
}

/// Resolve options file path: explicit flag → ./cfenv.toml → ~/.config/cfenv/cfenv.toml.
///
/// Unlike an explicit path, the default locations are optional.
fn resolve_config(explicit: Option<PathBuf>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.exists() {
            anyhow::bail!("Options file {:?} does not exist", path);
        }
        return Ok(Some(path));
    }

    let local = Path::new("cfenv.toml");
    if local.exists() {
        return Ok(Some(local.to_path_buf()));
    }

    if let Some(config_dir) = dirs::config_dir() {
        let xdg = config_dir.join("cfenv").join("cfenv.toml");
        if xdg.exists() {
            return Ok(Some(xdg));
        }
    }

    Ok(None)
}

/// Load and parse a cfenv.toml options file.
async fn load_config(config_path: &Path) -> Result<Options> {
    let content = tokio::fs::read_to_string(config_path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read options file {:?}: {}", config_path, e))?;
    let options = Options::from_toml_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse options file {:?}: {}", config_path, e))?;
    tracing::debug!(path = %config_path.display(), "loaded options file");
    Ok(options)
}
