//! Test helpers: build AppState and router for integration tests.
//!
//! Persistence is the in-memory repository and uploads go to a temporary
//! directory, so no database is needed.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum_test::TestServer;
use sealdrop_api::constants;
use sealdrop_api::setup::routes;
use sealdrop_api::state::AppState;
use sealdrop_core::{AppConfig, BaseConfig, IngestConfig};
use sealdrop_db::InMemoryIngestRepository;
use sealdrop_processing::IngestOrchestrator;
use sealdrop_storage::LocalUploadStore;
use tempfile::TempDir;

pub const TEST_KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

/// API path prefix for tests (e.g. `/api/v1`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

/// Test application: server plus the collaborators it was built from.
pub struct TestApp {
    pub server: TestServer,
    pub repository: Arc<InMemoryIngestRepository>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn upload_root(&self) -> &Path {
        self._temp_dir.path()
    }

    /// Every regular file under the upload root.
    pub fn stored_files(&self) -> Vec<PathBuf> {
        let mut found = Vec::new();
        collect_files(self.upload_root(), &mut found);
        found.sort();
        found
    }

    /// Directories directly under the date segments, i.e. one per uploader.
    pub fn user_dirs(&self) -> Vec<String> {
        let mut users = Vec::new();
        for date in read_dirs(self.upload_root()) {
            for user in read_dirs(&date) {
                if let Some(name) = user.file_name() {
                    users.push(name.to_string_lossy().into_owned());
                }
            }
        }
        users.sort();
        users
    }
}

fn read_dirs(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect()
        })
        .unwrap_or_default()
}

fn collect_files(dir: &Path, found: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, found);
        } else {
            found.push(path);
        }
    }
}

fn test_config(upload_root: &Path) -> AppConfig {
    AppConfig {
        base: BaseConfig {
            server_port: 0,
            cors_origins: vec!["*".to_string()],
            environment: "test".to_string(),
            database_url: None,
            db_max_connections: 1,
            db_timeout_seconds: 5,
            max_request_body_mb: 120,
            log_format: "text".to_string(),
        },
        ingest: IngestConfig::new(upload_root).with_encryption_key(TEST_KEY_HEX),
    }
}

/// Setup test app with local storage under a fresh temp dir.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(|_| {}).await
}

/// Like [`setup_test_app`], with a hook to adjust the ingest settings.
pub async fn setup_test_app_with(adjust: impl FnOnce(&mut IngestConfig)) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut config = test_config(temp_dir.path());
    adjust(&mut config.ingest);

    let store = Arc::new(
        LocalUploadStore::new(temp_dir.path())
            .await
            .expect("Failed to create upload store"),
    );
    let repository = Arc::new(InMemoryIngestRepository::new());
    let cipher = config.ingest.cipher().expect("Invalid test key");

    let orchestrator = Arc::new(IngestOrchestrator::new(
        Arc::new(config.ingest.clone()),
        repository.clone(),
        store.clone(),
        cipher,
    ));

    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        orchestrator,
    });

    let router = routes::setup_routes(&config, state).expect("Failed to setup routes");
    let server = TestServer::new(router).expect("Failed to start test server");

    TestApp {
        server,
        repository,
        _temp_dir: temp_dir,
    }
}
