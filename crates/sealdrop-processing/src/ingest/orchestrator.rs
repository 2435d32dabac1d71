use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use sealdrop_core::encryption::discard_partial;
use sealdrop_core::models::{
    BatchReport, FileKind, FileResult, IngestRequest, NewMediaAsset, RecordBatch,
    StructuredRecord, UploadedFile,
};
use sealdrop_core::{IngestConfig, StreamCipher};
use sealdrop_db::IngestRepository;
use sealdrop_storage::UploadStore;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::guard::BatchGuard;
use super::IngestError;
use crate::classifier::{classify, extension_of};
use crate::fields::{parse_ticker_sentiment, parse_topics};
use crate::tabular::{decode_file, Row};
use crate::validator::MediaValidator;

/// What was stored for a file before encryption.
enum Persisted {
    Records(u64),
    Media(Uuid),
}

/// Runs one batch through classification, decoding or validation,
/// persistence and encryption.
pub struct IngestOrchestrator {
    config: Arc<IngestConfig>,
    repository: Arc<dyn IngestRepository>,
    store: Arc<dyn UploadStore>,
    cipher: StreamCipher,
    validator: MediaValidator,
}

impl IngestOrchestrator {
    pub fn new(
        config: Arc<IngestConfig>,
        repository: Arc<dyn IngestRepository>,
        store: Arc<dyn UploadStore>,
        cipher: StreamCipher,
    ) -> Self {
        let validator = MediaValidator::new(config.max_media_size_bytes);
        Self {
            config,
            repository,
            store,
            cipher,
            validator,
        }
    }

    /// Process every file of `request`. Per-file failures end up in the report;
    /// this never fails as a whole.
    pub async fn run(&self, request: IngestRequest, cancel: CancellationToken) -> BatchReport {
        let started = Instant::now();
        let guard = BatchGuard::new(self.config.batch_timeout, cancel);

        tracing::info!(
            total_files = request.len(),
            max_concurrent_files = self.config.max_concurrent_files,
            "Processing batch"
        );

        // `buffered` yields in submission order regardless of completion order.
        let results: Vec<FileResult> = stream::iter(request.files.into_iter().enumerate())
            .map(|(index, file)| self.process_file(index, file, &guard))
            .buffered(self.config.max_concurrent_files.max(1))
            .collect()
            .await;

        let report = BatchReport::new(results);

        tracing::info!(
            total_files = report.total_files,
            succeeded = report.succeeded(),
            failed = report.failed(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Batch processed"
        );

        report
    }

    #[tracing::instrument(
        skip(self, file, guard),
        fields(
            file_index = index,
            original_filename = %file.original_filename,
            kind = tracing::field::Empty
        )
    )]
    async fn process_file(&self, index: usize, file: UploadedFile, guard: &BatchGuard) -> FileResult {
        let kind = classify(&file.original_filename);
        tracing::Span::current().record("kind", kind.as_str());
        tracing::debug!(bytes = file.size, state = "classified", "File classified");

        match self.accept(kind, &file, guard).await {
            Ok(persisted) => {
                tracing::debug!(state = "persisted", "File persisted");
                self.seal(kind, &file, persisted, guard).await
            }
            Err(err) => {
                tracing::info!(error = %err, code = err.code(), state = "failed", "File rejected");
                self.discard_plaintext(&file).await;
                FileResult::failed(&file.original_filename, kind, err.to_string())
            }
        }
    }

    /// Everything up to and including persistence.
    async fn accept(
        &self,
        kind: FileKind,
        file: &UploadedFile,
        guard: &BatchGuard,
    ) -> Result<Persisted, IngestError> {
        guard.check()?;

        if file.size == 0 {
            return Err(IngestError::EmptyFile);
        }

        match kind {
            FileKind::Rejected => Err(IngestError::ClassificationRejected),
            FileKind::StructuredData => self.ingest_tabular(file, guard).await,
            FileKind::Audio | FileKind::Video => self.ingest_media(kind, file).await,
        }
    }

    async fn ingest_tabular(
        &self,
        file: &UploadedFile,
        guard: &BatchGuard,
    ) -> Result<Persisted, IngestError> {
        let extension =
            extension_of(&file.original_filename).ok_or(IngestError::ClassificationRejected)?;

        let rows = guard.run(decode_file(file.path.clone(), extension)).await?;
        if rows.is_empty() {
            return Err(IngestError::EmptyDataset);
        }
        tracing::debug!(rows = rows.len(), state = "decoded", "File decoded");

        let batch = RecordBatch {
            source_file: file.original_filename.clone(),
            uploaded_by: file.uploaded_by.clone(),
            records: rows.into_iter().map(build_record).collect(),
        };

        let inserted = self.repository.insert_structured_records(&batch).await?;
        Ok(Persisted::Records(inserted))
    }

    async fn ingest_media(
        &self,
        kind: FileKind,
        file: &UploadedFile,
    ) -> Result<Persisted, IngestError> {
        let media_kind = self.validator.validate(kind, file.size)?;
        tracing::debug!(state = "validated", "Media validated");

        let asset = self
            .repository
            .create_media_asset(NewMediaAsset {
                kind: media_kind,
                filename: file.stored_filename.clone(),
                original_filename: file.original_filename.clone(),
                filepath: file.path.display().to_string(),
                size: i64::try_from(file.size).unwrap_or(i64::MAX),
                uploaded_by: file.uploaded_by.clone(),
            })
            .await?;

        Ok(Persisted::Media(asset.id))
    }

    /// Encrypt a persisted file and delete its plaintext. On failure the
    /// plaintext stays where it is.
    async fn seal(
        &self,
        kind: FileKind,
        file: &UploadedFile,
        persisted: Persisted,
        guard: &BatchGuard,
    ) -> FileResult {
        let artifact = self.store.artifact_path(&file.path);
        let artifact_name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if let Err(err) = guard
            .run(self.cipher.encrypt_file(&file.path, &artifact))
            .await
        {
            // A timed-out or cancelled write leaves its partial output behind.
            discard_partial(&artifact).await;
            tracing::error!(
                error = %err,
                code = err.code(),
                plaintext = %file.path.display(),
                state = "failed",
                "Encryption failed, plaintext retained"
            );
            return FileResult::failed(&file.original_filename, kind, err.to_string());
        }

        if let Err(e) = self.store.remove(&file.path).await {
            tracing::warn!(
                error = %e,
                plaintext = %file.path.display(),
                "Artifact written but plaintext could not be deleted"
            );
        }

        tracing::info!(encrypted_file = %artifact_name, state = "done", "File ingested");

        match persisted {
            Persisted::Records(count) => {
                FileResult::records_success(&file.original_filename, count, artifact_name)
            }
            Persisted::Media(id) => {
                FileResult::media_success(&file.original_filename, kind, id, artifact_name)
            }
        }
    }

    async fn discard_plaintext(&self, file: &UploadedFile) {
        if let Err(e) = self.store.remove(&file.path).await {
            tracing::warn!(error = %e, path = %file.path.display(), "Failed to discard staged upload");
        }
    }
}

/// Replace the raw `topics`/`ticker_sentiment` columns with their parsed form.
fn build_record(mut row: Row) -> StructuredRecord {
    let topics = row
        .remove("topics")
        .map(|raw| parse_topics(&raw))
        .unwrap_or_default();
    let ticker_sentiment = row
        .remove("ticker_sentiment")
        .map(|raw| parse_ticker_sentiment(&raw))
        .unwrap_or_default();

    StructuredRecord {
        columns: row,
        topics,
        ticker_sentiment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealdrop_core::constants::MAX_MEDIA_SIZE_BYTES;
    use sealdrop_core::models::{FileStatus, MediaKind, Topic};
    use sealdrop_db::InMemoryIngestRepository;
    use sealdrop_storage::LocalUploadStore;
    use std::time::Duration;
    use tempfile::TempDir;

    const TEST_KEY: &[u8; 32] = b"01234567890123456789012345678901";

    struct Harness {
        _dir: TempDir,
        store: Arc<LocalUploadStore>,
        repo: Arc<InMemoryIngestRepository>,
        config: IngestConfig,
    }

    impl Harness {
        async fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let store = Arc::new(LocalUploadStore::new(dir.path()).await.unwrap());
            let config = IngestConfig::new(dir.path());
            Self {
                _dir: dir,
                store,
                repo: Arc::new(InMemoryIngestRepository::new()),
                config,
            }
        }

        async fn stage(&self, name: &str, bytes: &[u8]) -> UploadedFile {
            let mut reader = std::io::Cursor::new(bytes.to_vec());
            let staged = self.store.stage_stream(name, &mut reader).await.unwrap();
            self.store.claim(staged, name, "alice").await.unwrap()
        }

        fn orchestrator_with(&self, cipher: StreamCipher) -> IngestOrchestrator {
            IngestOrchestrator::new(
                Arc::new(self.config.clone()),
                self.repo.clone(),
                self.store.clone(),
                cipher,
            )
        }

        fn orchestrator(&self) -> IngestOrchestrator {
            self.orchestrator_with(StreamCipher::from_key_bytes(TEST_KEY).unwrap())
        }
    }

    async fn run(orchestrator: &IngestOrchestrator, files: Vec<UploadedFile>) -> BatchReport {
        orchestrator
            .run(IngestRequest::new(files), CancellationToken::new())
            .await
    }

    #[tokio::test]
    async fn test_malformed_file_does_not_affect_siblings() {
        let h = Harness::new().await;
        let files = vec![
            h.stage("a.csv", b"title\nfirst\n").await,
            h.stage("b.docx", b"not allowed").await,
            h.stage("c.mp3", b"ID3audio").await,
            h.stage("d.mp4", b"video-bytes").await,
        ];
        let rejected_path = files[1].path.clone();

        let report = run(&h.orchestrator(), files).await;

        assert_eq!(report.total_files, 4);
        let names: Vec<_> = report.results.iter().map(|r| r.file.as_str()).collect();
        assert_eq!(names, ["a.csv", "b.docx", "c.mp3", "d.mp4"]);
        let errors: Vec<_> = report
            .results
            .iter()
            .enumerate()
            .filter(|(_, r)| r.status == FileStatus::Error)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(errors, [1]);
        assert_eq!(report.results[1].message.as_deref(), Some("invalid file type"));
        assert!(!rejected_path.exists());
    }

    #[tokio::test]
    async fn test_media_success_encrypts_and_deletes_plaintext() {
        let h = Harness::new().await;
        let file = h.stage("song.mp3", b"ID3 some audio frames").await;
        let plaintext = file.path.clone();

        let report = run(&h.orchestrator(), vec![file]).await;
        let result = &report.results[0];
        assert_eq!(result.status, FileStatus::Success);
        assert_eq!(result.kind, FileKind::Audio);

        let assets = h.repo.media_assets().await;
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].kind, MediaKind::Audio);
        assert_eq!(result.model_id, Some(assets[0].id));
        assert_eq!(assets[0].filepath, plaintext.display().to_string());

        let artifact = h.store.artifact_path(&plaintext);
        assert_eq!(
            result.encrypted_file.as_deref(),
            artifact.file_name().and_then(|n| n.to_str())
        );
        assert!(artifact.exists());
        assert!(!plaintext.exists());

        let restored = plaintext.with_extension("restored");
        StreamCipher::from_key_bytes(TEST_KEY)
            .unwrap()
            .decrypt_file(&artifact, &restored)
            .await
            .unwrap();
        assert_eq!(tokio::fs::read(&restored).await.unwrap(), b"ID3 some audio frames");
    }

    #[tokio::test]
    async fn test_oversized_audio_is_rejected() {
        let h = Harness::new().await;
        let big = vec![0u8; (MAX_MEDIA_SIZE_BYTES + 1) as usize];
        let file = h.stage("huge.mp3", &big).await;
        let plaintext = file.path.clone();

        let report = run(&h.orchestrator(), vec![file]).await;
        let result = &report.results[0];
        assert_eq!(result.status, FileStatus::Error);
        assert!(result.message.as_deref().unwrap().contains("must be under"));
        assert!(h.repo.media_assets().await.is_empty());
        assert!(!h.store.artifact_path(&plaintext).exists());
        assert!(result.encrypted_file.is_none());
    }

    #[tokio::test]
    async fn test_media_at_ceiling_is_accepted() {
        let mut h = Harness::new().await;
        h.config.max_media_size_bytes = 64;
        let file = h.stage("edge.mp4", &[1u8; 64]).await;

        let report = run(&h.orchestrator(), vec![file]).await;
        assert_eq!(report.results[0].status, FileStatus::Success);
    }

    #[tokio::test]
    async fn test_mixed_topics_keep_only_valid_tokens() {
        let h = Harness::new().await;
        let csv = "title,topics,ticker_sentiment\n\
                   BTC rallies,\"AI(0.92), bad-token, Crypto(0.88), (x)\",\"BTC(Bullish), ETH\"\n";
        let file = h.stage("news.csv", csv.as_bytes()).await;

        let report = run(&h.orchestrator(), vec![file]).await;
        let result = &report.results[0];
        assert_eq!(result.status, FileStatus::Success);
        assert_eq!(result.records, Some(1));

        let batches = h.repo.record_batches().await;
        let record = &batches[0].records[0];
        assert_eq!(
            record.topics,
            vec![
                Topic {
                    topic: "AI".to_string(),
                    relevance_score: "0.92".to_string()
                },
                Topic {
                    topic: "Crypto".to_string(),
                    relevance_score: "0.88".to_string()
                },
            ]
        );
        assert_eq!(record.ticker_sentiment.len(), 1);
        assert_eq!(record.ticker_sentiment[0].sentiment_score, "");
        assert_eq!(record.columns["title"], "BTC rallies");
        assert!(!record.columns.contains_key("topics"));
        assert_eq!(batches[0].uploaded_by, "alice");
        assert_eq!(batches[0].source_file, "news.csv");
    }

    #[tokio::test]
    async fn test_workbook_rows_are_stored_and_file_encrypted() {
        let h = Harness::new().await;
        let bytes = include_bytes!("../../tests/fixtures/articles.xlsx");
        let file = h.stage("report.xlsx", bytes).await;
        let plaintext = file.path.clone();

        let report = run(&h.orchestrator(), vec![file]).await;
        let result = &report.results[0];
        assert_eq!(result.status, FileStatus::Success);
        assert_eq!(result.records, Some(2));
        assert_eq!(result.message.as_deref(), Some("2 records stored"));
        assert!(result
            .encrypted_file
            .as_deref()
            .is_some_and(|name| name.ends_with(".xlsx.enc")));
        assert!(!plaintext.exists());

        let batches = h.repo.record_batches().await;
        assert_eq!(batches[0].source_file, "report.xlsx");
        let records = &batches[0].records;
        assert_eq!(records[0].topics.len(), 2);
        assert_eq!(records[0].ticker_sentiment[0].ticker, "BTC");
        assert_eq!(records[1].columns["title"], "Dip");
        assert!(records[1].topics.is_empty());
        assert_eq!(records[1].ticker_sentiment.len(), 1);
    }

    #[tokio::test]
    async fn test_encryption_failure_keeps_plaintext() {
        let h = Harness::new().await;
        let file = h.stage("keep.mp3", b"precious").await;
        let plaintext = file.path.clone();

        let report = run(&h.orchestrator_with(StreamCipher::unconfigured()), vec![file]).await;
        let result = &report.results[0];
        assert_eq!(result.status, FileStatus::Error);
        assert_eq!(
            result.message.as_deref(),
            Some("encryption failed: encryption key not configured")
        );
        assert!(plaintext.exists());
        assert!(!h.store.artifact_path(&plaintext).exists());
        // Persistence precedes encryption.
        assert_eq!(h.repo.media_assets().await.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_files_fail_regardless_of_kind() {
        let h = Harness::new().await;
        let files = vec![
            h.stage("empty.csv", b"").await,
            h.stage("empty.mp3", b"").await,
            h.stage("empty.txt", b"").await,
        ];

        let report = run(&h.orchestrator(), files).await;
        for result in &report.results {
            assert_eq!(result.status, FileStatus::Error);
            assert_eq!(result.message.as_deref(), Some("file is empty"));
        }
        assert!(h.repo.media_assets().await.is_empty());
    }

    #[tokio::test]
    async fn test_header_only_csv_is_empty_dataset() {
        let h = Harness::new().await;
        let file = h.stage("header.csv", b"a,b,c\n").await;

        let report = run(&h.orchestrator(), vec![file]).await;
        assert_eq!(report.results[0].message.as_deref(), Some("no valid data"));
        assert!(h.repo.record_batches().await.is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_workbook_fails() {
        let h = Harness::new().await;
        let file = h.stage("broken.xlsx", b"definitely not a workbook").await;
        let plaintext = file.path.clone();

        let report = run(&h.orchestrator(), vec![file]).await;
        let message = report.results[0].message.clone().unwrap();
        assert!(message.starts_with("failed to decode file"), "{message}");
        assert!(!plaintext.exists());
    }

    #[tokio::test]
    async fn test_insert_failure_is_not_retried() {
        let h = Harness::new().await;
        h.repo.fail_records(true);
        let file = h.stage("rows.csv", b"a\n1\n").await;
        let plaintext = file.path.clone();

        let report = run(&h.orchestrator(), vec![file]).await;
        let result = &report.results[0];
        assert_eq!(result.status, FileStatus::Error);
        assert!(result.message.as_deref().unwrap().starts_with("failed to store data"));
        assert!(!plaintext.exists());
        assert!(!h.store.artifact_path(&plaintext).exists());
    }

    #[tokio::test]
    async fn test_results_keep_input_order_when_later_files_finish_first() {
        let h = Harness::new().await;
        h.repo.delay_for("slow.mp3", Duration::from_millis(150)).await;
        let files = vec![
            h.stage("slow.mp3", b"slow").await,
            h.stage("fast.mp4", b"fast").await,
            h.stage("rows.csv", b"x\n1\n").await,
        ];

        let report = run(&h.orchestrator(), files).await;
        let names: Vec<_> = report.results.iter().map(|r| r.file.as_str()).collect();
        assert_eq!(names, ["slow.mp3", "fast.mp4", "rows.csv"]);
        assert!(report.results.iter().all(|r| r.is_success()));

        // Completion order differs from input order.
        let persisted: Vec<_> = h
            .repo
            .media_assets()
            .await
            .into_iter()
            .map(|a| a.original_filename)
            .collect();
        assert_eq!(persisted, ["fast.mp4", "slow.mp3"]);
    }

    #[tokio::test]
    async fn test_cancelled_batch_reports_every_file() {
        let h = Harness::new().await;
        let files = vec![h.stage("a.csv", b"a\n1\n").await, h.stage("b.mp3", b"b").await];
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = h
            .orchestrator()
            .run(IngestRequest::new(files), cancel)
            .await;
        assert_eq!(report.total_files, 2);
        for result in &report.results {
            assert_eq!(result.message.as_deref(), Some("batch cancelled"));
        }
        assert!(h.repo.media_assets().await.is_empty());
    }

    #[tokio::test]
    async fn test_expired_deadline_times_out() {
        let mut h = Harness::new().await;
        h.config.batch_timeout = Duration::ZERO;
        let file = h.stage("a.csv", b"a\n1\n").await;

        let report = run(&h.orchestrator(), vec![file]).await;
        assert_eq!(report.results[0].message.as_deref(), Some("operation timed out"));
    }

    #[tokio::test]
    async fn test_empty_request_yields_empty_report() {
        let h = Harness::new().await;
        let report = run(&h.orchestrator(), Vec::new()).await;
        assert_eq!(report.total_files, 0);
        assert!(report.results.is_empty());
    }

    #[test]
    fn test_build_record_without_special_columns() {
        let mut row = Row::new();
        row.insert("price".to_string(), "64000".to_string());
        let record = build_record(row);
        assert!(record.topics.is_empty());
        assert!(record.ticker_sentiment.is_empty());
        assert_eq!(record.columns["price"], "64000");
    }
}
