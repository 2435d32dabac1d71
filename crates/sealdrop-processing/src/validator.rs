use sealdrop_core::models::{FileKind, MediaKind};

/// Validation errors for media files
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("file size must be under {max} bytes (got {size} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("not a media file: {0}")]
    NotMedia(FileKind),

    #[error("file is empty")]
    EmptyFile,
}

/// Media file validator
///
/// Audio and video files are accepted up to and including `max_file_size`.
#[derive(Debug, Clone)]
pub struct MediaValidator {
    max_file_size: u64,
}

impl MediaValidator {
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: u64) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Validate a classified file and return its media kind.
    pub fn validate(&self, kind: FileKind, size: u64) -> Result<MediaKind, ValidationError> {
        let media_kind = kind.media_kind().ok_or(ValidationError::NotMedia(kind))?;
        self.validate_file_size(size)?;
        Ok(media_kind)
    }
}
