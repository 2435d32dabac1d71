use sealdrop_core::EncryptionError;
use sealdrop_db::DbError;

use crate::tabular::DecodeError;
use crate::validator::ValidationError;

/// Why a single file failed. Never aborts the rest of the batch.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("invalid file type")]
    ClassificationRejected,

    #[error("file is empty")]
    EmptyFile,

    #[error("file size must be under {max} bytes (got {size} bytes)")]
    OversizedMedia { size: u64, max: u64 },

    #[error("failed to decode file: {0}")]
    Decode(#[from] DecodeError),

    #[error("no valid data")]
    EmptyDataset,

    #[error("failed to store data: {0}")]
    Persistence(#[from] DbError),

    #[error("encryption failed: {0}")]
    Encryption(#[from] EncryptionError),

    #[error("operation timed out")]
    Timeout,

    #[error("batch cancelled")]
    Cancelled,
}

impl From<ValidationError> for IngestError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::EmptyFile => IngestError::EmptyFile,
            ValidationError::FileTooLarge { size, max } => IngestError::OversizedMedia { size, max },
            ValidationError::NotMedia(_) => IngestError::ClassificationRejected,
        }
    }
}

impl IngestError {
    /// Stable machine-readable name, used in logs.
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::ClassificationRejected => "classification_rejected",
            IngestError::EmptyFile => "empty_file",
            IngestError::OversizedMedia { .. } => "oversized_media",
            IngestError::Decode(_) => "decode_error",
            IngestError::EmptyDataset => "empty_dataset",
            IngestError::Persistence(_) => "persistence_error",
            IngestError::Encryption(_) => "encryption_error",
            IngestError::Timeout => "timeout",
            IngestError::Cancelled => "cancelled",
        }
    }
}
