//! Shared constants

/// Owner recorded when a batch arrives without a username.
pub const DEFAULT_USERNAME: &str = "UnknownUser";

/// Ceiling for audio and video uploads (10 MiB). Files strictly larger are rejected.
pub const MAX_MEDIA_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Maximum number of files accepted in one batch request.
pub const MAX_FILES_PER_BATCH: usize = 10;

/// AES block size; also the length of the IV that prefixes every artifact.
pub const IV_LEN: usize = 16;

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// Extension appended to the generated filename of an encrypted artifact.
pub const ARTIFACT_EXTENSION: &str = "enc";
