use anyhow::Result;
use doc_gateway::{
    config::{AppConfig, Backend},
    routes,
    services::{
        document_service::DocumentService, local_store::LocalObjectStore,
        memory_store::MemoryObjectStore, object_store::ObjectStore,
    },
};
use std::{io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = AppConfig::from_env_and_args()?;

    tracing::info!("Starting doc-gateway with config: {:?}", cfg);

    // --- Initialize object store ---
    let store: Arc<dyn ObjectStore> = match cfg.backend {
        Backend::Local => {
            tracing::debug!("Connecting using raw URL => {}", cfg.database_url);
            let store = LocalObjectStore::connect(&cfg.database_url, &cfg.storage_dir).await?;

            let applied = store.run_migrations().await?;
            tracing::info!("Applied {} migration statements", applied);

            // --- Handle migration mode ---
            if migrate {
                tracing::info!("Database migration complete.");
                return Ok(());
            }
            Arc::new(store)
        }
        Backend::Memory => {
            if migrate {
                tracing::info!("Memory backend has no schema; nothing to migrate.");
                return Ok(());
            }
            Arc::new(MemoryObjectStore::new())
        }
    };

    // --- Initialize core service ---
    let service = DocumentService::new(store, cfg.bucket.clone(), cfg.max_upload_bytes);
    match service.ensure_bucket().await {
        Ok(()) => tracing::info!("Bucket {} is ready", service.bucket()),
        Err(err) => tracing::warn!(
            "Could not prepare bucket {} ({}). Bucket will be created on first request",
            service.bucket(),
            err
        ),
    }

    // --- Build router ---
    let app = routes::routes::app(service);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
