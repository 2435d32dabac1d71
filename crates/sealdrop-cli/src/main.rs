//! Sealdrop CLI: local maintenance for an upload root.
//!
//! Reads the same environment as the server (`ENCRYPTION_KEY`, `UPLOAD_ROOT`,
//! `DATABASE_URL`, ...).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sealdrop_cli::{decrypt_artifact, ingest_dir, init_tracing};
use sealdrop_core::constants::DEFAULT_USERNAME;
use sealdrop_core::{AppConfig, IngestConfig};
use sealdrop_db::{IngestRepository, InMemoryIngestRepository, PgIngestRepository};
use sealdrop_processing::IngestOrchestrator;
use sealdrop_storage::LocalUploadStore;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "sealdrop", about = "Sealdrop ingestion CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decrypt an artifact (`*.enc`) with ENCRYPTION_KEY
    Decrypt {
        /// Encrypted artifact
        artifact: PathBuf,
        /// Where to write the plaintext
        output: PathBuf,
        /// Overwrite `output` if it exists
        #[arg(long)]
        force: bool,
    },
    /// Run every file of a directory through the ingestion pipeline
    ///
    /// Without DATABASE_URL nothing is persisted (dry run), but files are
    /// still copied into UPLOAD_ROOT and encrypted.
    Ingest {
        /// Directory holding the files to ingest
        dir: PathBuf,
        /// Uploader name the files are attributed to
        #[arg(long, env = "SEALDROP_USER", default_value = DEFAULT_USERNAME)]
        user: String,
    },
}

async fn repository(config: &AppConfig) -> anyhow::Result<Arc<dyn IngestRepository>> {
    match config.database_url() {
        Some(url) => {
            let pool = sealdrop_db::connect(
                url,
                config.db_max_connections(),
                config.db_timeout_seconds(),
            )
            .await?;
            sealdrop_db::run_migrations(&pool).await?;
            Ok(Arc::new(PgIngestRepository::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, records and media assets are not persisted");
            Ok(Arc::new(InMemoryIngestRepository::new()))
        }
    }
}

/// Cancel the batch on Ctrl+C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Received Ctrl+C, cancelling batch");
            token.cancel();
        }
    });
    cancel
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Decrypt {
            artifact,
            output,
            force,
        } => {
            let cipher = IngestConfig::from_env()?
                .cipher()
                .context("Invalid ENCRYPTION_KEY")?;
            let written = decrypt_artifact(&cipher, &artifact, &output, force).await?;
            println!(
                "{}",
                serde_json::json!({ "output": output.display().to_string(), "bytes": written })
            );
        }
        Commands::Ingest { dir, user } => {
            let config = AppConfig::from_env()?;
            config.validate().context("Configuration validation failed")?;

            let store = Arc::new(
                LocalUploadStore::new(config.upload_root())
                    .await
                    .context("Failed to initialize upload store")?,
            );
            let orchestrator = IngestOrchestrator::new(
                Arc::new(config.ingest.clone()),
                repository(&config).await?,
                store.clone(),
                config.ingest.cipher()?,
            );

            let report =
                ingest_dir(&orchestrator, store.as_ref(), &dir, &user, cancel_on_ctrl_c()).await?;
            let out = serde_json::to_string_pretty(&report).context("Serialize report")?;
            println!("{}", out);
        }
    }

    Ok(())
}
