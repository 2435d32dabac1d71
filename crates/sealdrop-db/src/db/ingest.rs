use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sealdrop_core::models::{MediaAsset, NewMediaAsset, RecordBatch};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::IngestRepository;

// Postgres caps bind parameters at 65535; 6 per row.
const INSERT_CHUNK_ROWS: usize = 1000;

#[derive(Clone)]
pub struct PgIngestRepository {
    pool: PgPool,
}

impl PgIngestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IngestRepository for PgIngestRepository {
    #[tracing::instrument(skip(self, batch), fields(source_file = %batch.source_file, rows = batch.len()))]
    async fn insert_structured_records(&self, batch: &RecordBatch) -> Result<u64, DbError> {
        if batch.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;

        for chunk in batch.records.chunks(INSERT_CHUNK_ROWS) {
            let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
                r#"
                INSERT INTO structured_records (
                    id, source_file, uploaded_by, columns, topics, ticker_sentiment
                )
                "#,
            );

            query_builder.push_values(chunk.iter(), |mut b, record| {
                b.push_bind(Uuid::new_v4())
                    .push_bind(&batch.source_file)
                    .push_bind(&batch.uploaded_by)
                    .push_bind(Json(&record.columns))
                    .push_bind(Json(&record.topics))
                    .push_bind(Json(&record.ticker_sentiment));
            });

            let result = query_builder.build().execute(&mut *tx).await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;

        tracing::debug!(inserted, "Inserted structured records");
        Ok(inserted)
    }

    #[tracing::instrument(skip(self, asset), fields(kind = asset.kind.as_str(), filename = %asset.filename))]
    async fn create_media_asset(&self, asset: NewMediaAsset) -> Result<MediaAsset, DbError> {
        let id = Uuid::new_v4();

        let (uploaded_at,): (DateTime<Utc>,) = sqlx::query_as(
            r#"
            INSERT INTO media_assets (
                id, kind, filename, original_filename, filepath, size, uploaded_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING uploaded_at
            "#,
        )
        .bind(id)
        .bind(asset.kind.as_str())
        .bind(&asset.filename)
        .bind(&asset.original_filename)
        .bind(&asset.filepath)
        .bind(asset.size)
        .bind(&asset.uploaded_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(MediaAsset {
            id,
            kind: asset.kind,
            filename: asset.filename,
            original_filename: asset.original_filename,
            filepath: asset.filepath,
            size: asset.size,
            uploaded_by: asset.uploaded_by,
            uploaded_at,
        })
    }
}
