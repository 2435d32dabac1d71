use std::io;
use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    Json,
};
use futures::TryStreamExt;
use sealdrop_core::constants::DEFAULT_USERNAME;
use sealdrop_core::models::{BatchReport, IngestRequest, UploadedFile};
use sealdrop_core::AppError;
use sealdrop_storage::StagedUpload;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;

use crate::constants::{FILES_FIELD, USERNAME_FIELD};
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use crate::utils::upload::client_filename;

/// A part written to the staging area, with the name the client gave it.
struct Staged {
    original_filename: String,
    upload: StagedUpload,
}

/// Upload a batch of files for ingestion
///
/// Tabular files (`.csv`, `.xls`, `.xlsx`) are decoded into structured records,
/// `.mp3` and `.mp4` files are registered as media assets. Every accepted file
/// is then encrypted at rest and its plaintext removed. The response reports
/// each file separately and is a 200 even when some files failed.
#[utoipa::path(
    post,
    path = "/api/v1/upload",
    tag = "ingest",
    request_body(
        content = inline(Object),
        content_type = "multipart/form-data",
        description = "Up to 10 `files` parts and an optional `username` text field"
    ),
    responses(
        (status = 200, description = "Batch processed, see per-file results", body = BatchReport),
        (status = 400, description = "No files, too many files or unreadable multipart body", body = ErrorResponse),
        (status = 413, description = "Request body too large", body = ErrorResponse),
        (status = 500, description = "Uploads could not be staged", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, multipart),
    fields(
        operation = "upload_batch",
        username = tracing::field::Empty,
        total_files = tracing::field::Empty
    )
)]
pub async fn upload_batch(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<BatchReport>, HttpAppError> {
    let mut staged = Vec::new();

    let username = match read_multipart(&state, &mut multipart, &mut staged).await {
        Ok(username) => username,
        Err(err) => {
            discard_staged(&state, staged).await;
            return Err(err);
        }
    };
    let username = username.unwrap_or_else(|| DEFAULT_USERNAME.to_string());

    let span = tracing::Span::current();
    span.record("username", username.as_str());
    span.record("total_files", staged.len());

    if staged.is_empty() {
        return Err(AppError::BadRequest("No files uploaded".to_string()).into());
    }

    let files = claim_all(&state, staged, &username).await?;

    // Dropping the handler future (client went away) cancels the batch.
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let report = state
        .orchestrator
        .run(IngestRequest::new(files), cancel)
        .await;

    tracing::info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        "Upload batch completed"
    );

    Ok(Json(report))
}

/// Stage every `files` part and return the `username` field, if any.
///
/// Parts are appended to `staged` as they complete so the caller can clean
/// them up when a later part fails.
async fn read_multipart(
    state: &AppState,
    multipart: &mut Multipart,
    staged: &mut Vec<Staged>,
) -> Result<Option<String>, HttpAppError> {
    let max_files = state.config.max_files_per_batch();
    let mut username = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some(FILES_FIELD) => {
                if staged.len() >= max_files {
                    return Err(AppError::BadRequest(format!(
                        "Too many files: at most {} per batch",
                        max_files
                    ))
                    .into());
                }

                let original_filename = client_filename(field.file_name());

                // Keep the multipart error itself so a body-limit hit still maps to 413.
                let mut body_error: Option<MultipartError> = None;
                let result = {
                    let stream = field.map_err(|e| {
                        let err = io::Error::other(e.body_text());
                        body_error = Some(e);
                        err
                    });
                    let mut reader = StreamReader::new(Box::pin(stream));
                    state
                        .store
                        .stage_stream(&original_filename, &mut reader)
                        .await
                };

                match result {
                    Ok(upload) => staged.push(Staged {
                        original_filename,
                        upload,
                    }),
                    Err(err) => {
                        return Err(match body_error {
                            Some(body_error) => body_error.into(),
                            None => err.into(),
                        })
                    }
                }
            }
            Some(USERNAME_FIELD) => {
                let value = field.text().await?;
                let value = value.trim();
                if !value.is_empty() {
                    username = Some(value.to_string());
                }
            }
            other => {
                tracing::debug!(field = ?other, "Ignoring unknown multipart field");
            }
        }
    }

    Ok(username)
}

/// Move staged parts under `username`. On failure nothing is left behind.
async fn claim_all(
    state: &AppState,
    staged: Vec<Staged>,
    username: &str,
) -> Result<Vec<UploadedFile>, HttpAppError> {
    let mut files = Vec::with_capacity(staged.len());
    let mut pending = staged.into_iter();

    while let Some(part) = pending.next() {
        match state
            .store
            .claim(part.upload.clone(), &part.original_filename, username)
            .await
        {
            Ok(file) => files.push(file),
            Err(err) => {
                for file in &files {
                    if let Err(e) = state.store.remove(&file.path).await {
                        tracing::warn!(error = %e, path = %file.path.display(), "Failed to remove claimed upload");
                    }
                }
                let mut rest = vec![part];
                rest.extend(pending);
                discard_staged(state, rest).await;
                return Err(err.into());
            }
        }
    }

    Ok(files)
}

async fn discard_staged(state: &AppState, staged: Vec<Staged>) {
    for part in staged {
        if let Err(e) = state.store.remove(&part.upload.path).await {
            tracing::warn!(
                error = %e,
                path = %part.upload.path.display(),
                "Failed to remove staged upload"
            );
        }
    }
}
