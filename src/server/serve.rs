use std::sync::{Arc, Mutex};

use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::{DbLocation, ServeSettings, Settings};
use crate::package::cache::Cache;
use crate::package::indexes::PyPiIndex;
use crate::package::resolver::Resolver;
use crate::server::app::router;

pub type PyPiResolver = Resolver<PyPiIndex, Cache>;

/// Opens the cache and wires it to the PyPI index
pub fn build_resolver(settings: &Settings) -> anyhow::Result<PyPiResolver> {
    let cache = match settings.db_location() {
        DbLocation::Memory => Cache::in_memory()?,
        DbLocation::File(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).inspect_err(|e| {
                    error!("Failed to create database directory {:?}: {}", parent, e);
                })?;
            }
            Cache::new(&path)?
        }
    };

    let index = PyPiIndex::new(&settings.index_url, settings.upstream_timeout())?;
    info!(
        "Using package index {} with a cache TTL of {}h",
        settings.index_url, settings.cache_ttl_hours
    );

    Ok(Resolver::new(
        index,
        Arc::new(Mutex::new(cache)),
        settings.cache_ttl(),
    ))
}

pub async fn run_server(settings: Settings, serve: ServeSettings) -> anyhow::Result<()> {
    info!("Starting pypi-pulse server");

    let resolver = Arc::new(build_resolver(&settings)?);
    let app = router(resolver);

    let listener = TcpListener::bind((serve.host.as_str(), serve.port)).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("pypi-pulse server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
