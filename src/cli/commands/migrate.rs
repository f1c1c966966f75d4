use anyhow::Context;

use crate::config::{AppConfig, BackendKind};
use crate::database::DatabaseManager;

pub async fn handle(config: &AppConfig) -> anyhow::Result<()> {
    if config.database.backend == BackendKind::Memory {
        tracing::info!("Memory backend selected; nothing to migrate");
        return Ok(());
    }

    let mut database = config.database.clone();
    database.run_migrations = false;
    let backend = DatabaseManager::connect(&database)
        .await
        .context("failed to connect to the database")?;

    DatabaseManager::migrate(backend.pool())
        .await
        .context("failed to apply migrations")?;
    DatabaseManager::close(backend.pool()).await;
    Ok(())
}
