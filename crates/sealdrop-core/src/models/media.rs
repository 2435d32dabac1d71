use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }
}

/// Metadata for a media asset about to be persisted.
#[derive(Debug, Clone)]
pub struct NewMediaAsset {
    pub kind: MediaKind,
    pub filename: String,
    pub original_filename: String,
    /// Plaintext location at insert time. Not rewritten after encryption.
    pub filepath: String,
    pub size: i64,
    pub uploaded_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MediaAsset {
    pub id: Uuid,
    pub kind: MediaKind,
    pub filename: String,
    pub original_filename: String,
    pub filepath: String,
    pub size: i64,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
}

impl MediaAsset {
    /// Build the stored entity from insert metadata, stamping id and time.
    pub fn from_new(new: NewMediaAsset) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: new.kind,
            filename: new.filename,
            original_filename: new.original_filename,
            filepath: new.filepath,
            size: new.size,
            uploaded_by: new.uploaded_by,
            uploaded_at: Utc::now(),
        }
    }
}
