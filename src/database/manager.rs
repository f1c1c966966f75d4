use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use super::{BackendError, PgBackend};
use crate::config::DatabaseConfig;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Connection pool setup and schema migrations for the Postgres backend
pub struct DatabaseManager;

impl DatabaseManager {
    /// Open a pool against `DATABASE_URL`, optionally applying pending migrations
    pub async fn connect(config: &DatabaseConfig) -> Result<PgBackend, BackendError> {
        let url = config
            .url
            .as_deref()
            .ok_or(BackendError::ConfigMissing("DATABASE_URL"))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!(max_connections = config.max_connections, "Created database pool");

        if config.run_migrations {
            Self::migrate(&pool).await?;
        }

        Ok(PgBackend::new(pool))
    }

    pub async fn migrate(pool: &PgPool) -> Result<(), BackendError> {
        MIGRATOR.run(pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Close the pool (e.g., on shutdown)
    pub async fn close(pool: &PgPool) {
        pool.close().await;
        info!("Closed database pool");
    }
}
