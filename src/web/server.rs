use axum::{routing::get, Router};
use std::future::Future;
use tower_http::trace::TraceLayer;

use super::api::{get_core_logs, get_supervisor_logs, get_system_logs, get_z2m_logs, health_check, AppState};
use super::files::{get_z2m_external_converter, get_z2m_file, list_z2m_external_converters, list_z2m_files};

/// Build the gateway router over the given state
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/logs/system", get(get_system_logs))
        .route("/logs/core", get(get_core_logs))
        .route("/logs/supervisor", get(get_supervisor_logs))
        .route("/logs/z2m", get(get_z2m_logs))
        .route("/files/z2m", get(list_z2m_files))
        .route("/files/z2m/", get(list_z2m_files))
        .route("/files/z2m/external_converters", get(list_z2m_external_converters))
        .route("/files/z2m/external_converters/", get(list_z2m_external_converters))
        .route("/files/z2m/external_converters/:name", get(get_z2m_external_converter))
        .route("/files/z2m/:name", get(get_z2m_file))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the gateway on `listen` until `shutdown` resolves
pub async fn run_server<F>(state: AppState, listen: &str, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(listen).await?;
    tracing::info!(addr = %listener.local_addr()?, "Log gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("Log gateway shutting down gracefully");
        })
        .await
}
