//! API constants

/// Prefix of every versioned route.
pub const API_PREFIX: &str = "/api/v1";

/// Name of the multipart field carrying file blobs.
pub const FILES_FIELD: &str = "files";

/// Name of the multipart field carrying the uploader's name.
pub const USERNAME_FIELD: &str = "username";

/// Requests served at once before new ones queue.
pub const HTTP_CONCURRENCY_LIMIT: usize = 1024;
