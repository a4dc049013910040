use session_manager::{create_routes, PgStore, SessionConfig, SessionManager};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Missing or invalid configuration is fatal
    let config = SessionConfig::from_env()?;
    config.validate()?;

    let store = Arc::new(PgStore::connect(&config).await?);
    store.migrate().await?;

    let manager = Arc::new(SessionManager::with_store(&config, store)?);
    let app = create_routes(manager);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Starting server at {}", config.bind_addr);

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
