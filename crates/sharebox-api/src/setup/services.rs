//! Service wiring

use crate::services::file_lifecycle::FileLifecycleService;
use crate::state::AppState;
use anyhow::{Context, Result};
use sharebox_core::Config;
use sharebox_db::FileRepository;
use sharebox_processing::UploadOrchestrator;
use sharebox_storage::create_store;
use std::sync::Arc;

pub async fn initialize_services(
    config: &Config,
    repository: Arc<dyn FileRepository>,
) -> Result<Arc<AppState>> {
    let store = create_store(config.storage())
        .await
        .context("Failed to initialize remote store")?;
    tracing::info!(backend = ?config.storage_backend(), "Remote store initialized");

    let orchestrator = Arc::new(UploadOrchestrator::from_config(config, store)?);
    let files = FileLifecycleService::new(repository, orchestrator);

    Ok(Arc::new(AppState::new(config.clone(), files)))
}
