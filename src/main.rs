use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use order_dispatch::api;
use order_dispatch::config::Config;
use order_dispatch::distance::{DistanceResolver, GoogleDistanceResolver};
use order_dispatch::error::AppError;
use order_dispatch::state::AppState;
use order_dispatch::store::{MemoryOrderStore, OrderStore, PgOrderStore};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false);
    if config.log_json {
        subscriber.json().init();
    } else {
        subscriber.compact().init();
    }

    let store = build_store(&config).await?;
    let resolver: Arc<dyn DistanceResolver> = Arc::new(
        GoogleDistanceResolver::new(
            config.distance_api_key.clone(),
            config.distance_api_url.clone(),
            config.distance_timeout,
        )
        .map_err(|err| AppError::Internal(err.to_string()))?,
    );

    let shared_state = Arc::new(AppState::new(store, resolver));
    let app = api::rest::router(shared_state);

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn build_store(config: &Config) -> Result<Arc<dyn OrderStore>, AppError> {
    let Some(url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL is not set; orders are kept in memory only");
        return Ok(Arc::new(MemoryOrderStore::new()));
    };

    let store = PgOrderStore::connect(url, config.db_max_connections)
        .await
        .map_err(|err| AppError::Internal(format!("failed to connect to database: {err}")))?;
    store
        .migrate()
        .await
        .map_err(|err| AppError::Internal(format!("failed to prepare schema: {err}")))?;

    tracing::info!("connected to postgres");
    Ok(Arc::new(store))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
