//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;

use std::sync::Arc;

use anyhow::{Context, Result};
use sealdrop_core::AppConfig;
use sealdrop_infra::{init_telemetry, TelemetryOptions};
use sealdrop_processing::IngestOrchestrator;
use sealdrop_storage::LocalUploadStore;

use crate::state::AppState;

/// Initialize the entire application
pub async fn initialize_app(config: AppConfig) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    config
        .validate()
        .context("Configuration validation failed")?;

    init_telemetry(&TelemetryOptions {
        json: config.log_json(),
        environment: config.environment().to_string(),
    })?;

    tracing::info!(
        upload_root = %config.upload_root().display(),
        max_files_per_batch = config.max_files_per_batch(),
        "Configuration loaded and validated successfully"
    );

    let repository = database::setup_database(&config).await?;

    let store = Arc::new(
        LocalUploadStore::new(config.upload_root())
            .await
            .context("Failed to initialize upload store")?,
    );

    let cipher = config.ingest.cipher()?;
    if !cipher.is_configured() {
        tracing::warn!("ENCRYPTION_KEY not set; every accepted file will fail encryption");
    }

    let orchestrator = Arc::new(IngestOrchestrator::new(
        Arc::new(config.ingest.clone()),
        repository,
        store.clone(),
        cipher,
    ));

    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        orchestrator,
    });

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
