use std::sync::Arc;

use anyhow::Context;
use patchgen_core::PatchEngine;
use tracing_subscriber::EnvFilter;

pub mod config;
mod http_server;
pub mod storage;

pub use config::{Cli, Commands, ServerConfig};
pub use http_server::{AppError, AppState, GenerateResponse, ListFilesResponse, create_router};
pub use storage::{FsStorage, PatchStorage, StorageError};

/// Install the global tracing subscriber. Logs go to stderr so `generate` can
/// write patches to stdout.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Load the catalog and selection tables named by `config`.
///
/// A missing, unparsable or empty catalog is an error here, so the server never
/// starts accepting requests without one.
pub fn load_engine(config: &ServerConfig) -> anyhow::Result<PatchEngine> {
    let engine = PatchEngine::load(&config.catalog_path, config.tables_path.as_deref())
        .with_context(|| {
            format!(
                "Failed to load module catalog from {}",
                config.catalog_path.display()
            )
        })?;

    tracing::info!(
        "Loaded catalog: {} plugins, {} modules",
        engine.catalog().plugin_count(),
        engine.catalog().len()
    );
    for (style, model) in engine.tables().stale_models(engine.catalog()) {
        tracing::warn!("Style '{}' lists model '{}' which no plugin provides", style, model);
    }

    Ok(engine)
}

/// Create shared state for the server
pub fn create_server_state(config: &ServerConfig) -> anyhow::Result<AppState> {
    let engine = load_engine(config)?;
    let storage = FsStorage::new(&config.storage_dir);
    tracing::info!("Storing patches in {}", storage.dir().display());

    Ok(AppState {
        engine: Arc::new(engine),
        storage: Arc::new(storage),
        public_url: config.public_url.clone(),
        unique_filenames: config.unique_filenames,
    })
}

pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let state = create_server_state(&config)?;
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(
        "HTTP server listening on http://localhost:{} (public URL {})",
        config.port,
        config.public_url
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
