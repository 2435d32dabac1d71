//! Upload store abstraction
//!
//! The orchestrator and the HTTP layer only need a few filesystem operations:
//! stage bytes somewhere unique, move them under their owner once the owner
//! is known, derive the artifact path, and delete plaintext.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sealdrop_core::models::UploadedFile;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Bytes written to the staging area, not yet attributed to a user.
#[derive(Debug, Clone)]
pub struct StagedUpload {
    pub path: PathBuf,
    /// Generated unique name, `{uuid}.{ext}` or `{uuid}` without an extension.
    pub stored_filename: String,
    pub size: u64,
}

#[async_trait]
pub trait UploadStore: Send + Sync {
    /// Root directory of the store.
    fn root(&self) -> &Path;

    /// Write a byte stream to a fresh staging path.
    ///
    /// `original_filename` only contributes its extension to the generated name.
    async fn stage_stream(
        &self,
        original_filename: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> StorageResult<StagedUpload>;

    /// Copy an existing local file to a fresh staging path. The source is untouched.
    async fn stage_copy(&self, src: &Path, original_filename: &str) -> StorageResult<StagedUpload>;

    /// Move a staged upload into the directory of `username`.
    async fn claim(
        &self,
        staged: StagedUpload,
        original_filename: &str,
        username: &str,
    ) -> StorageResult<UploadedFile>;

    /// Path of the encrypted artifact for a plaintext path.
    fn artifact_path(&self, plaintext: &Path) -> PathBuf;

    /// Delete a file inside the store. Missing files are not an error.
    async fn remove(&self, path: &Path) -> StorageResult<()>;
}
