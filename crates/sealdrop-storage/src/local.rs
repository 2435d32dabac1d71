use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sealdrop_core::models::UploadedFile;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};

use crate::keys::{artifact_file_name, generate_filename, sanitize_segment};
use crate::traits::{StagedUpload, StorageError, StorageResult, UploadStore};

const INCOMING_DIR: &str = ".incoming";

/// Local filesystem upload store
#[derive(Clone, Debug)]
pub struct LocalUploadStore {
    root: PathBuf,
}

impl LocalUploadStore {
    /// Create a new LocalUploadStore, creating `root` if needed.
    pub async fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();

        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create upload directory {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(LocalUploadStore { root })
    }

    fn date_segment() -> String {
        chrono::Utc::now().format("%Y-%m-%d").to_string()
    }

    fn incoming_dir(&self) -> PathBuf {
        self.root.join(Self::date_segment()).join(INCOMING_DIR)
    }

    fn user_dir(&self, username: &str) -> PathBuf {
        self.root
            .join(Self::date_segment())
            .join(sanitize_segment(username))
    }

    /// Reject paths that are not strictly inside the root.
    fn check_inside_root(&self, path: &Path) -> StorageResult<()> {
        let escapes = path
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir));
        if escapes || path.strip_prefix(&self.root).is_err() {
            return Err(StorageError::InvalidPath(format!(
                "{} is outside the upload root",
                path.display()
            )));
        }
        Ok(())
    }

    async fn fresh_staging_path(&self, original_filename: &str) -> StorageResult<(PathBuf, String)> {
        let dir = self.incoming_dir();
        fs::create_dir_all(&dir).await?;
        let stored_filename = generate_filename(original_filename);
        Ok((dir.join(&stored_filename), stored_filename))
    }
}

#[async_trait]
impl UploadStore for LocalUploadStore {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn stage_stream(
        &self,
        original_filename: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> StorageResult<StagedUpload> {
        let (path, stored_filename) = self.fresh_staging_path(original_filename).await?;
        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        let copied = tokio::io::copy(reader, &mut file).await;
        let size = match copied {
            Ok(size) => size,
            Err(e) => {
                drop(file);
                let _ = fs::remove_file(&path).await;
                return Err(StorageError::UploadFailed(format!(
                    "Failed to write stream to file {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        file.flush().await?;
        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            original_filename = %original_filename,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Staged upload stream"
        );

        Ok(StagedUpload {
            path,
            stored_filename,
            size,
        })
    }

    async fn stage_copy(&self, src: &Path, original_filename: &str) -> StorageResult<StagedUpload> {
        let (path, stored_filename) = self.fresh_staging_path(original_filename).await?;

        let size = fs::copy(src, &path).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to copy {} to {}: {}",
                src.display(),
                path.display(),
                e
            ))
        })?;

        tracing::debug!(
            src = %src.display(),
            path = %path.display(),
            size_bytes = size,
            "Staged local file"
        );

        Ok(StagedUpload {
            path,
            stored_filename,
            size,
        })
    }

    async fn claim(
        &self,
        staged: StagedUpload,
        original_filename: &str,
        username: &str,
    ) -> StorageResult<UploadedFile> {
        self.check_inside_root(&staged.path)?;

        let dir = self.user_dir(username);
        fs::create_dir_all(&dir).await?;
        let target = dir.join(&staged.stored_filename);

        fs::rename(&staged.path, &target).await.map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                StorageError::NotFound(staged.path.display().to_string())
            } else {
                StorageError::UploadFailed(format!(
                    "Failed to move {} to {}: {}",
                    staged.path.display(),
                    target.display(),
                    e
                ))
            }
        })?;

        Ok(UploadedFile {
            original_filename: original_filename.to_string(),
            stored_filename: staged.stored_filename,
            path: target,
            size: staged.size,
            uploaded_by: username.to_string(),
        })
    }

    fn artifact_path(&self, plaintext: &Path) -> PathBuf {
        let name = plaintext
            .file_name()
            .map(|n| artifact_file_name(&n.to_string_lossy()))
            .unwrap_or_else(|| artifact_file_name("artifact"));
        plaintext.with_file_name(name)
    }

    async fn remove(&self, path: &Path) -> StorageResult<()> {
        self.check_inside_root(path)?;

        match fs::remove_file(path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Removed file");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete file {}: {}",
                path.display(),
                e
            ))),
        }
    }
}
