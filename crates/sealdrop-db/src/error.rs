use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("invalid row: {0}")]
    InvalidRow(String),

    /// Failure raised on purpose by the in-memory repository.
    #[error("{0}")]
    Unavailable(String),
}

impl From<DbError> for sealdrop_core::AppError {
    fn from(err: DbError) -> Self {
        sealdrop_core::AppError::Database(err.to_string())
    }
}
