//! Sealdrop Storage Library
//!
//! Upload staging for the ingestion pipeline. Files land on local disk under
//! a date-stamped, per-user layout:
//!
//! - **Staged (user not yet known)**: `{root}/{YYYY-MM-DD}/.incoming/{uuid}.{ext}`
//! - **Claimed**: `{root}/{YYYY-MM-DD}/{user}/{uuid}.{ext}`
//! - **Artifact**: `{root}/{YYYY-MM-DD}/{user}/{uuid}.{ext}.enc`
//!
//! User segments are sanitized so they can never escape the root.

pub(crate) mod keys;
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use keys::{artifact_file_name, sanitize_segment};
pub use local::LocalUploadStore;
pub use traits::{StagedUpload, StorageError, StorageResult, UploadStore};
