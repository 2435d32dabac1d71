use async_trait::async_trait;
use sealdrop_core::models::{MediaAsset, NewMediaAsset, RecordBatch};

use crate::error::DbError;

/// Persistence collaborator of the ingestion pipeline.
///
/// Calls for different files are independent: implementations must not hold a
/// lock or transaction across calls.
#[async_trait]
pub trait IngestRepository: Send + Sync {
    /// Insert all records of one file as a single operation. Returns the inserted count.
    async fn insert_structured_records(&self, batch: &RecordBatch) -> Result<u64, DbError>;

    /// Persist metadata for an audio or video file.
    async fn create_media_asset(&self, asset: NewMediaAsset) -> Result<MediaAsset, DbError>;
}
