use anyhow::Result;
use artworks_api::{
    config, db,
    routes::routes::routes,
    services::{
        artwork_service::ArtworkService,
        blob_store::LocalBlobStore,
        error_sink::TracingErrorSink,
        rate_limiter::RateLimiter,
        upload_pool::UploadPolicy,
    },
    state::AppState,
};
use std::{fs, io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting artworks-api with config: {:?}", cfg);

    // --- Ensure media directory exists ---
    if !Path::new(&cfg.storage_dir).exists() {
        fs::create_dir_all(&cfg.storage_dir)?;
        tracing::info!("Created storage directory at {}", cfg.storage_dir);
    }

    // --- Initialize SQLite connection ---
    let pool = db::connect(&cfg.database_url).await?;

    // --- Handle migration mode ---
    if migrate {
        db::run_migrations(&pool).await?;
        tracing::info!("Database migration complete.");
        return Ok(()); // exit after migration
    }

    // --- Initialize services ---
    let media = Arc::new(LocalBlobStore::new(
        cfg.storage_dir.clone(),
        cfg.public_base_url.clone(),
    ));
    let artworks = ArtworkService::new(
        Arc::new(pool),
        media.clone(),
        Arc::new(TracingErrorSink),
        UploadPolicy {
            max_image_bytes: cfg.max_image_bytes,
            max_workers: cfg.upload_workers,
        },
    );
    let state = AppState::new(
        artworks,
        media,
        RateLimiter::new(cfg.rate_limit_per_minute),
    );

    // --- Build router ---
    let app = routes(state, cfg.max_body_bytes());

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
