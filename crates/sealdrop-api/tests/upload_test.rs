mod helpers;

use axum::body::Bytes;
use axum_test::multipart::{MultipartForm, Part};
use helpers::{api_path, setup_test_app, setup_test_app_with};
use serde_json::Value;

fn file_part(name: &str, bytes: &'static [u8]) -> Part {
    Part::bytes(bytes).file_name(name.to_string())
}

#[tokio::test]
async fn test_upload_without_files_is_bad_request() {
    let app = setup_test_app().await;

    let form = MultipartForm::new().add_text("username", "alice");
    let response = app.client().post(&api_path("/upload")).multipart(form).await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["code"], "BAD_REQUEST");
    assert_eq!(body["error"], "No files uploaded");
    assert!(app.repository.record_batches().await.is_empty());
}

#[tokio::test]
async fn test_upload_with_too_many_files_is_rejected_and_cleaned_up() {
    let app = setup_test_app().await;

    let mut form = MultipartForm::new().add_text("username", "alice");
    for i in 0..11 {
        form = form.add_part("files", file_part(&format!("f{}.csv", i), b"title\nrow\n"));
    }
    let response = app.client().post(&api_path("/upload")).multipart(form).await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("at most 10"));
    assert!(app.stored_files().is_empty());
    assert!(app.repository.record_batches().await.is_empty());
}

#[tokio::test]
async fn test_mixed_batch_reports_each_file_in_order() {
    let app = setup_test_app().await;

    let form = MultipartForm::new()
        .add_text("username", "alice")
        .add_part(
            "files",
            file_part(
                "news.csv",
                b"title,topics,ticker_sentiment\nRally,\"AI(0.92), junk\",BTC(Bullish)\n",
            ),
        )
        .add_part("files", file_part("notes.docx", b"not allowed"))
        .add_part("files", file_part("song.mp3", b"ID3-audio-bytes"));
    let response = app.client().post(&api_path("/upload")).multipart(form).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "Batch processed");
    assert_eq!(body["total_files"], 3);

    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);

    assert_eq!(results[0]["file"], "news.csv");
    assert_eq!(results[0]["type"], "structured-data");
    assert_eq!(results[0]["status"], "success");
    assert_eq!(results[0]["message"], "1 records stored");
    assert!(results[0]["encrypted_file"].as_str().unwrap().ends_with(".csv.enc"));

    assert_eq!(results[1]["file"], "notes.docx");
    assert_eq!(results[1]["status"], "error");
    assert_eq!(results[1]["message"], "invalid file type");
    assert!(results[1].get("type").is_none());

    assert_eq!(results[2]["file"], "song.mp3");
    assert_eq!(results[2]["type"], "audio");
    assert_eq!(results[2]["status"], "success");
    assert!(results[2]["model_id"].is_string());

    let batches = app.repository.record_batches().await;
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].uploaded_by, "alice");
    let record = &batches[0].records[0];
    assert_eq!(record.columns["title"], "Rally");
    assert_eq!(record.topics.len(), 1);
    assert_eq!(record.topics[0].topic, "AI");
    assert_eq!(record.ticker_sentiment[0].sentiment_label, "Bullish");

    let assets = app.repository.media_assets().await;
    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0].original_filename, "song.mp3");
    assert_eq!(results[2]["model_id"], assets[0].id.to_string());

    // Only the two artifacts remain: no plaintext, nothing from the rejected file.
    let stored = app.stored_files();
    assert_eq!(stored.len(), 2);
    assert!(stored
        .iter()
        .all(|p| p.extension().is_some_and(|e| e == "enc")));
    assert_eq!(app.user_dirs(), vec!["alice".to_string()]);
}

#[tokio::test]
async fn test_missing_username_stores_under_unknown_user() {
    let app = setup_test_app().await;

    let form = MultipartForm::new().add_part("files", file_part("clip.mp4", b"video-bytes"));
    let response = app.client().post(&api_path("/upload")).multipart(form).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["results"][0]["status"], "success");
    assert_eq!(body["results"][0]["type"], "video");
    assert_eq!(app.user_dirs(), vec!["UnknownUser".to_string()]);
    assert_eq!(app.repository.media_assets().await[0].uploaded_by, "UnknownUser");
}

#[tokio::test]
async fn test_empty_and_oversized_files_fail_individually() {
    let app = setup_test_app_with(|ingest| ingest.max_media_size_bytes = 8).await;

    let form = MultipartForm::new()
        .add_text("username", "bob")
        .add_part("files", file_part("empty.csv", b""))
        .add_part("files", file_part("big.mp3", b"123456789"))
        .add_part("files", file_part("ok.mp3", b"12345678"));
    let response = app.client().post(&api_path("/upload")).multipart(form).await;

    response.assert_status_ok();
    let body: Value = response.json();
    let results = body["results"].as_array().unwrap();
    assert_eq!(results[0]["message"], "file is empty");
    assert_eq!(results[1]["status"], "error");
    assert!(results[1]["model_id"].is_null());
    assert_eq!(results[2]["status"], "success");
    assert_eq!(app.repository.media_assets().await.len(), 1);
}

#[tokio::test]
async fn test_persistence_failure_is_reported_per_file() {
    let app = setup_test_app().await;
    app.repository.fail_records(true);

    let form = MultipartForm::new()
        .add_part("files", file_part("a.csv", b"title\nfirst\n"))
        .add_part("files", file_part("b.mp3", b"audio"));
    let response = app.client().post(&api_path("/upload")).multipart(form).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["results"][0]["status"], "error");
    assert!(body["results"][0]["message"]
        .as_str()
        .unwrap()
        .starts_with("failed to store data"));
    assert_eq!(body["results"][1]["status"], "success");
}

#[tokio::test]
async fn test_unreadable_multipart_body_is_bad_request() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post(&api_path("/upload"))
        .content_type("multipart/form-data; boundary=sealdrop-boundary")
        .bytes(Bytes::from_static(b"this is not a multipart body"))
        .await;

    response.assert_status_bad_request();
    assert!(app.stored_files().is_empty());
}

#[tokio::test]
async fn test_long_filename_keeps_its_extension() {
    let app = setup_test_app().await;
    let long_name = format!("{}.csv", "q".repeat(300));

    let form = MultipartForm::new().add_part("files", file_part(&long_name, b"title\nfirst\n"));
    let response = app.client().post(&api_path("/upload")).multipart(form).await;

    response.assert_status_ok();
    let body: Value = response.json();
    let result = &body["results"][0];
    assert_eq!(result["status"], "success");
    assert_eq!(result["type"], "structured-data");
    let reported = result["file"].as_str().unwrap();
    assert_eq!(reported.len(), 255);
    assert!(reported.ends_with(".csv"));
    assert_eq!(app.repository.record_batches().await[0].source_file, reported);
}
