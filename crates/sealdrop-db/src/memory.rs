//! In-memory ingest repository
//!
//! Stores everything in process memory. Used by tests and by the CLI dry run.
//! Failures and latency can be injected to exercise the pipeline's error paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sealdrop_core::models::{MediaAsset, NewMediaAsset, RecordBatch};
use tokio::sync::Mutex;

use crate::error::DbError;
use crate::repository::IngestRepository;

#[derive(Clone, Default)]
pub struct InMemoryIngestRepository {
    record_batches: Arc<Mutex<Vec<RecordBatch>>>,
    media_assets: Arc<Mutex<Vec<MediaAsset>>>,
    fail_records: Arc<AtomicBool>,
    fail_media: Arc<AtomicBool>,
    /// Artificial latency keyed by original filename.
    delays: Arc<Mutex<HashMap<String, Duration>>>,
}

impl InMemoryIngestRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every structured-record insert fail.
    pub fn fail_records(&self, fail: bool) {
        self.fail_records.store(fail, Ordering::SeqCst);
    }

    /// Make every media asset insert fail.
    pub fn fail_media(&self, fail: bool) {
        self.fail_media.store(fail, Ordering::SeqCst);
    }

    /// Delay persistence of the file whose original name is `original_filename`.
    pub async fn delay_for(&self, original_filename: impl Into<String>, delay: Duration) {
        self.delays.lock().await.insert(original_filename.into(), delay);
    }

    pub async fn record_batches(&self) -> Vec<RecordBatch> {
        self.record_batches.lock().await.clone()
    }

    pub async fn media_assets(&self) -> Vec<MediaAsset> {
        self.media_assets.lock().await.clone()
    }

    async fn apply_delay(&self, original_filename: &str) {
        let delay = self.delays.lock().await.get(original_filename).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl IngestRepository for InMemoryIngestRepository {
    async fn insert_structured_records(&self, batch: &RecordBatch) -> Result<u64, DbError> {
        self.apply_delay(&batch.source_file).await;

        if self.fail_records.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable(
                "structured record store unavailable".to_string(),
            ));
        }

        let inserted = batch.len() as u64;
        self.record_batches.lock().await.push(batch.clone());
        Ok(inserted)
    }

    async fn create_media_asset(&self, asset: NewMediaAsset) -> Result<MediaAsset, DbError> {
        self.apply_delay(&asset.original_filename).await;

        if self.fail_media.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable("media store unavailable".to_string()));
        }

        let asset = MediaAsset::from_new(asset);
        self.media_assets.lock().await.push(asset.clone());
        Ok(asset)
    }
}
