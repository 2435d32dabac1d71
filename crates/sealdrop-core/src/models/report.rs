use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::file::FileKind;

pub const BATCH_PROCESSED_MESSAGE: &str = "Batch processed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Success,
    Error,
}

/// Outcome of one file of a batch.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FileResult {
    /// Original filename as submitted.
    pub file: String,
    #[serde(
        rename = "type",
        default,
        skip_serializing_if = "FileKind::is_rejected"
    )]
    pub kind: FileKind,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Media asset id, for audio and video files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<Uuid>,
    /// Number of records inserted, for tabular files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<u64>,
    /// File name of the encrypted artifact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_file: Option<String>,
}

impl FileResult {
    pub fn failed(file: impl Into<String>, kind: FileKind, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            kind,
            status: FileStatus::Error,
            message: Some(message.into()),
            model_id: None,
            records: None,
            encrypted_file: None,
        }
    }

    pub fn media_success(
        file: impl Into<String>,
        kind: FileKind,
        model_id: Uuid,
        encrypted_file: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            kind,
            status: FileStatus::Success,
            message: None,
            model_id: Some(model_id),
            records: None,
            encrypted_file: Some(encrypted_file.into()),
        }
    }

    pub fn records_success(
        file: impl Into<String>,
        records: u64,
        encrypted_file: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            kind: FileKind::StructuredData,
            status: FileStatus::Success,
            message: Some(format!("{} records stored", records)),
            model_id: None,
            records: Some(records),
            encrypted_file: Some(encrypted_file.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == FileStatus::Success
    }
}

/// Terminal output of one batch. `results[i]` belongs to input file `i`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchReport {
    pub message: String,
    pub total_files: usize,
    pub results: Vec<FileResult>,
}

impl BatchReport {
    pub fn new(results: Vec<FileResult>) -> Self {
        Self {
            message: BATCH_PROCESSED_MESSAGE.to_string(),
            total_files: results.len(),
            results,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total_files - self.succeeded()
    }
}
