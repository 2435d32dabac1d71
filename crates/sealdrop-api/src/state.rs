use std::sync::Arc;

use sealdrop_core::AppConfig;
use sealdrop_processing::IngestOrchestrator;
use sealdrop_storage::UploadStore;

/// Shared, read-only application state.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn UploadStore>,
    pub orchestrator: Arc<IngestOrchestrator>,
}
