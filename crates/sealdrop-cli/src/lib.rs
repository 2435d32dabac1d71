//! Local operations on an upload root: re-run a directory through the
//! pipeline, or turn an artifact back into plaintext.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use sealdrop_core::models::{BatchReport, IngestRequest, UploadedFile};
use sealdrop_core::StreamCipher;
use sealdrop_processing::IngestOrchestrator;
use sealdrop_storage::UploadStore;
use tokio_util::sync::CancellationToken;

/// Initialize tracing for CLI binaries. Logs go to stderr so reports on
/// stdout stay machine-readable.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Regular, non-hidden files directly inside `dir`, sorted by name.
pub async fn input_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to read directory {}", dir.display()))?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if !hidden && entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Copy every file of `dir` into the store under `user` and run them as one batch.
///
/// Source files are left untouched.
pub async fn ingest_dir(
    orchestrator: &IngestOrchestrator,
    store: &dyn UploadStore,
    dir: &Path,
    user: &str,
    cancel: CancellationToken,
) -> anyhow::Result<BatchReport> {
    let sources = input_files(dir).await?;
    if sources.is_empty() {
        bail!("No files found in {}", dir.display());
    }

    let files = stage_sources(store, &sources, user).await?;

    tracing::info!(dir = %dir.display(), user, total_files = files.len(), "Ingesting directory");

    Ok(orchestrator.run(IngestRequest::new(files), cancel).await)
}

/// Copy `sources` into the store under `user`. On failure every copy made so
/// far is removed again.
async fn stage_sources(
    store: &dyn UploadStore,
    sources: &[PathBuf],
    user: &str,
) -> anyhow::Result<Vec<UploadedFile>> {
    let mut files = Vec::with_capacity(sources.len());
    for src in sources {
        match stage_source(store, src, user).await {
            Ok(file) => files.push(file),
            Err(err) => {
                for file in &files {
                    if let Err(e) = store.remove(&file.path).await {
                        tracing::warn!(error = %e, path = %file.path.display(), "Failed to remove claimed copy");
                    }
                }
                return Err(err);
            }
        }
    }
    Ok(files)
}

async fn stage_source(
    store: &dyn UploadStore,
    src: &Path,
    user: &str,
) -> anyhow::Result<UploadedFile> {
    let original_filename = src
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let staged = store
        .stage_copy(src, &original_filename)
        .await
        .with_context(|| format!("Failed to stage {}", src.display()))?;
    let staged_path = staged.path.clone();

    match store.claim(staged, &original_filename, user).await {
        Ok(file) => Ok(file),
        Err(err) => {
            if let Err(e) = store.remove(&staged_path).await {
                tracing::warn!(error = %e, path = %staged_path.display(), "Failed to remove staged copy");
            }
            Err(err).with_context(|| format!("Failed to claim {}", src.display()))
        }
    }
}

/// Decrypt `artifact` into `output`. Refuses to replace an existing file
/// unless `force` is set.
pub async fn decrypt_artifact(
    cipher: &StreamCipher,
    artifact: &Path,
    output: &Path,
    force: bool,
) -> anyhow::Result<u64> {
    if !cipher.is_configured() {
        bail!("ENCRYPTION_KEY must be set to decrypt artifacts");
    }
    if !force && tokio::fs::try_exists(output).await.unwrap_or(false) {
        bail!("{} already exists (use --force to overwrite)", output.display());
    }

    let written = cipher
        .decrypt_file(artifact, output)
        .await
        .with_context(|| format!("Failed to decrypt {}", artifact.display()))?;

    tracing::info!(
        artifact = %artifact.display(),
        output = %output.display(),
        bytes = written,
        "Artifact decrypted"
    );
    Ok(written)
}
