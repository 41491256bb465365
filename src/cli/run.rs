use crate::config::parse::{load_config, ConfigError};
use crate::upstream::{SupervisorClient, UpstreamError};
use crate::web::{run_server, AppState};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("no config file found (searched ~/.config/loggw/config.yml, /etc/loggw/config.yml); use --config <path> or run 'loggw config init'")]
    ConfigNotFound,

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("upstream client error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("web server error: {0}")]
    WebServer(#[from] std::io::Error),
}

pub async fn run(config_path: Option<PathBuf>) -> Result<(), RunError> {
    let config_path = config_path.ok_or(RunError::ConfigNotFound)?;
    serve(&config_path).await
}

async fn serve(config_path: &Path) -> Result<(), RunError> {
    info!(config_path = %config_path.display(), "Loading configuration");
    let config = load_config(config_path)?;

    let client = SupervisorClient::new(&config.upstream)?;
    info!(
        upstream = client.base_url(),
        lines_default = config.lines.default,
        lines_max = config.lines.max,
        z2m_slug = %config.z2m.slug,
        "Supervisor client ready"
    );

    let listen = config.web.listen.clone();
    let state = AppState::new(config, Arc::new(client));

    run_server(state, &listen, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
        info!("Shutdown signal received");
    })
    .await?;

    Ok(())
}
