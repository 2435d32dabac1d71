//! Database setup and initialization

use std::sync::Arc;

use anyhow::{Context, Result};
use sealdrop_core::AppConfig;
use sealdrop_db::{connect, run_migrations, IngestRepository, PgIngestRepository};

/// Connect to Postgres, apply migrations and wrap the pool in a repository.
pub async fn setup_database(config: &AppConfig) -> Result<Arc<dyn IngestRepository>> {
    let database_url = config
        .database_url()
        .context("DATABASE_URL must be set to run the server")?;

    tracing::info!("Connecting to database...");
    let pool = connect(
        database_url,
        config.db_max_connections(),
        config.db_timeout_seconds(),
    )
    .await?;

    run_migrations(&pool).await?;

    Ok(Arc::new(PgIngestRepository::new(pool)))
}
