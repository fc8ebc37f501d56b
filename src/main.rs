use anyhow::Context;
use dotenvy::dotenv;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::settings::AppConfig;
use crate::infrastructure::storage::artifact_store::ArtifactStore;
use crate::modules::convert::service::{ConversionService, JobPolicy};
use crate::state::AppState;
use crate::workers::cleanup::CleanupScheduler;
use crate::workers::transcoder::Transcoder;

mod app;
mod common;
mod config;
mod docs;
mod infrastructure;
mod modules;
mod routes;
mod state;
mod workers;

#[cfg(all(test, unix))]
mod test_support;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting server...");

    let config = AppConfig::new();

    // Refuse to start if jobs could never complete
    let transcoder = Transcoder::from_config(&config);
    match transcoder.ensure_available().await {
        Ok(version) => info!(program = %transcoder.program().display(), %version, "Transcoder found"),
        Err(e) => {
            error!("FFmpeg is not installed or not in PATH. Application cannot function: {}", e);
            return Err(e.into());
        }
    }

    let store = ArtifactStore::open(&config.upload_dir)
        .await
        .with_context(|| format!("cannot prepare upload dir {}", config.upload_dir.display()))?;
    if let Err(e) = store.purge_stale().await {
        warn!("Failed to purge stale artifacts: {}", e);
    }

    let cleanup = CleanupScheduler::new();
    let converter = ConversionService::new(
        store,
        transcoder,
        cleanup.clone(),
        JobPolicy::from_config(&config),
    );

    let addr = format!("0.0.0.0:{}", config.server_port);
    let state = AppState::new(config, converter);
    let app = app::create_app(state).await;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("cannot bind {}", addr))?;
    info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let pending = cleanup.pending();
    if pending > 0 {
        warn!(pending, "Exiting with cleanup batches pending; leftovers are purged on next start");
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
