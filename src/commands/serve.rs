//! Serve command - Wires storage, locks and the extractor into the API.

use std::sync::Arc;
use std::time::Duration;

use crate::api::{create_router, AppState};
use crate::cli::args::ServeArgs;
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::infra::{
    Cache, Database, EmbeddingExtractor, HttpEmbeddingExtractor, LocalUserLocks, Persistence,
    RedisUserLocks, UserLocks,
};
use crate::services::Services;

/// Execute the serve command
pub async fn execute(args: ServeArgs, config: Config) -> AppResult<()> {
    tracing::info!(host = %args.host, port = args.port, "Starting attendance engine");

    let db = if args.skip_migrations {
        tracing::warn!("Skipping migrations; the schema must already be current");
        Database::connect_without_migrations(&config).await
    } else {
        Database::connect(&config).await
    }
    .map_err(|e| AppError::internal(format!("Database connection failed: {}", e)))?;
    let db = Arc::new(db);

    // Per-user write locks: shared through Redis when configured
    let (cache, locks): (Option<Arc<Cache>>, Arc<dyn UserLocks>) = match &config.redis_url {
        Some(url) => {
            let cache = Cache::connect(url)
                .await
                .map_err(|e| AppError::internal(format!("Redis connection failed: {}", e)))?;
            tracing::info!("Using distributed user locks");
            (
                Some(Arc::new(cache.clone())),
                Arc::new(RedisUserLocks::new(cache)),
            )
        }
        None => {
            tracing::info!("REDIS_URL not set, using in-process user locks");
            (None, Arc::new(LocalUserLocks::new()))
        }
    };

    let extractor: Arc<dyn EmbeddingExtractor> = Arc::new(HttpEmbeddingExtractor::new(
        config.extractor_url.clone(),
        Duration::from_millis(config.matching.extractor_timeout_ms),
    )?);
    tracing::info!(url = %config.extractor_url, "Embedding extractor configured");

    let uow = Arc::new(Persistence::new(db.get_connection()));
    let services = Arc::new(Services::build(uow, extractor, locks, &config));
    let app_state = AppState::with_infrastructure(services, db, cache);

    let app = create_router(app_state);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind to {}: {}", addr, e)))?;

    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    Ok(())
}
