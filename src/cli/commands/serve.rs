use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;

use crate::app::{app, AppState};
use crate::config::{AppConfig, BackendKind};
use crate::database::{ArcBackend, DatabaseManager, MemoryBackend};

pub async fn handle(config: &AppConfig, port: Option<u16>) -> anyhow::Result<()> {
    if config.security.jwt_secret.is_empty() {
        anyhow::bail!("SECURITY_JWT_SECRET must be set outside development");
    }
    if crate::is_development!() {
        tracing::warn!("Running with development defaults; do not expose this instance");
    }

    let (backend, pool) = open_backend(config).await?;
    let router = app(AppState::new(backend, config), config);

    let bind_addr = format!("0.0.0.0:{}", port.unwrap_or(config.api.port));
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!(
        environment = ?config.environment,
        backend = ?config.database.backend,
        "Sports Events API listening on http://{}",
        bind_addr
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(pool) = pool {
        DatabaseManager::close(&pool).await;
    }
    Ok(())
}

async fn open_backend(config: &AppConfig) -> anyhow::Result<(ArcBackend, Option<PgPool>)> {
    match config.database.backend {
        BackendKind::Memory => {
            tracing::info!("Using in-memory backend; data is lost on exit");
            Ok((Arc::new(MemoryBackend::new()), None))
        }
        BackendKind::Postgres => {
            let backend = DatabaseManager::connect(&config.database)
                .await
                .context("failed to connect to the database")?;
            let pool = backend.pool().clone();
            Ok((Arc::new(backend), Some(pool)))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
