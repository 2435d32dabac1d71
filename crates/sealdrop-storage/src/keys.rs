//! Path segment helpers shared by upload store implementations.

use sealdrop_core::constants::{ARTIFACT_EXTENSION, DEFAULT_USERNAME};
use uuid::Uuid;

const MAX_SEGMENT_LEN: usize = 64;

/// Sanitize a user-supplied name so it is a single safe directory segment.
///
/// Only ASCII alphanumerics, `-` and `_` survive; everything else becomes `_`.
/// Blank names, and names made only of separators, fall back to the default user.
pub fn sanitize_segment(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_SEGMENT_LEN)
        .collect();

    if sanitized.chars().all(|c| c == '_') {
        DEFAULT_USERNAME.to_string()
    } else {
        sanitized
    }
}

/// Lowercased extension of `filename`, restricted to ASCII alphanumerics.
pub(crate) fn safe_extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Fresh unique filename carrying the original extension.
pub(crate) fn generate_filename(original_filename: &str) -> String {
    match safe_extension(original_filename) {
        Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
        None => Uuid::new_v4().to_string(),
    }
}

/// Artifact name for a stored filename: `{stored}.enc`.
pub fn artifact_file_name(stored_filename: &str) -> String {
    format!("{}.{}", stored_filename, ARTIFACT_EXTENSION)
}
