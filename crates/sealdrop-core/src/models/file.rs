use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::media::MediaKind;

/// Kind resolved for an uploaded file from its extension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum FileKind {
    StructuredData,
    Audio,
    Video,
    #[default]
    Rejected,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::StructuredData => "structured-data",
            FileKind::Audio => "audio",
            FileKind::Video => "video",
            FileKind::Rejected => "rejected",
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, FileKind::Rejected)
    }

    pub fn media_kind(&self) -> Option<MediaKind> {
        match self {
            FileKind::Audio => Some(MediaKind::Audio),
            FileKind::Video => Some(MediaKind::Video),
            _ => None,
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file of an incoming batch, already staged on disk as plaintext.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Name supplied by the client.
    pub original_filename: String,
    /// Generated unique name (`{uuid}.{ext}`) used on disk.
    pub stored_filename: String,
    /// Location of the staged plaintext.
    pub path: PathBuf,
    pub size: u64,
    pub uploaded_by: String,
}

/// One submitted batch, in submission order.
#[derive(Debug, Clone, Default)]
pub struct IngestRequest {
    pub files: Vec<UploadedFile>,
}

impl IngestRequest {
    pub fn new(files: Vec<UploadedFile>) -> Self {
        Self { files }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
