//! Demo HTTP server that answers every request with a plain-text dump of the
//! resolved environment. Handy for checking what an app sees after a push.

use std::sync::Arc;

use axum::Router;
use axum::http::header;
use axum::response::IntoResponse;
use tokio_util::sync::CancellationToken;

use crate::app_env::AppEnv;
use crate::error::ConfigError;
use crate::services::ServiceSpec;
use crate::url_builder::Replacements;

/// Binding looked up by the default dump sample.
pub const SAMPLE_SERVICE: &str = "cf-env-test";

/// Optional service URL lookup included in the dump.
#[derive(Debug, Clone)]
pub struct DumpSample {
    pub spec: ServiceSpec,
    pub replacements: Replacements,
}

impl Default for DumpSample {
    /// `cf-env-test` with its path set to `database` and credentials in the userinfo.
    fn default() -> Self {
        Self {
            spec: ServiceSpec::from(SAMPLE_SERVICE),
            replacements: Replacements::new()
                .component("pathname", "database")
                .auth("username", "password"),
        }
    }
}

/// Render the dump: environment JSON, service directory JSON and, if a
/// sample is configured, the derived service URL. Sections are separated by
/// blank lines.
pub fn generate_dump(app_env: &AppEnv, sample: Option<&DumpSample>) -> crate::Result<String> {
    let to_err = |e: serde_json::Error| ConfigError::Serialize(e.to_string());

    let mut sections = vec![
        format!("cfenv.getAppEnv(): {}", app_env.to_json_pretty()?),
        format!(
            "appEnv.getServices(): {}",
            serde_json::to_string_pretty(&app_env.service_directory()).map_err(to_err)?
        ),
    ];
    if let Some(sample) = sample {
        sections.push(format!(
            "appEnv.getServiceURL(): {}",
            app_env.get_service_url(&sample.spec, &sample.replacements)
        ));
    }
    Ok(sections.join("\n\n"))
}

/// Router serving a precomputed dump at every path.
pub fn dump_router(dump: Arc<str>) -> Router {
    Router::new().fallback(move || {
        let dump = dump.clone();
        async move { ([(header::CONTENT_TYPE, "text/plain")], dump.to_string()).into_response() }
    })
}

/// Serve the dump on the environment's bind address and port until `cancel` fires.
pub async fn serve_dump(
    app_env: Arc<AppEnv>,
    sample: Option<DumpSample>,
    cancel: CancellationToken,
) -> crate::Result<()> {
    let dump: Arc<str> = generate_dump(&app_env, sample.as_ref())?.into();
    let app = dump_router(dump);

    let addr = format!("{}:{}", app_env.bind(), app_env.port());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        url = app_env.url().unwrap_or_default(),
        addr = %addr,
        "server starting"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}
