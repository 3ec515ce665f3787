//! Test helpers: build the router over the in-memory repository and a local
//! store rooted in a temp dir.
//!
//! Run from workspace root: `cargo test -p sharebox-api`.

#![allow(dead_code)]

pub mod auth;

use axum_test::TestServer;
use sharebox_api::constants;
use sharebox_api::setup::{routes, services};
use sharebox_core::{
    BaseConfig, Config, PipelineSettings, ServiceConfig, StorageSettings, StoreBackend,
};
use sharebox_db::{FileRepository, InMemoryFileRepository};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub const TEST_BASE_URL: &str = "http://localhost:6000/media";
pub const TEST_MAX_UPLOAD_BYTES: u64 = 1024 * 1024;

/// API path with the `/api` prefix.
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

/// Test application: server plus the owned scratch directories.
pub struct TestApp {
    pub server: TestServer,
    pub repository: Arc<InMemoryFileRepository>,
    pub _temp_dir: TempDir,
    pub store_root: PathBuf,
    pub upload_temp_dir: PathBuf,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Number of files currently held by the local store.
    pub fn stored_file_count(&self) -> usize {
        count_files(&self.store_root)
    }

    /// Number of multipart buffers left behind.
    pub fn buffered_file_count(&self) -> usize {
        count_files(&self.upload_temp_dir)
    }
}

fn count_files(dir: &std::path::Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .flatten()
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                count_files(&path)
            } else {
                1
            }
        })
        .sum()
}

pub async fn setup_test_app() -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let store_root = temp_dir.path().join("store");
    let upload_temp_dir = temp_dir.path().join("uploads");

    let config = create_test_config(&temp_dir, &store_root, &upload_temp_dir);
    let repository = Arc::new(InMemoryFileRepository::new());

    let state = services::initialize_services(
        &config,
        repository.clone() as Arc<dyn FileRepository>,
    )
    .await
    .expect("Failed to initialize services");
    let app = routes::setup_routes(&config, state)
        .await
        .expect("Failed to setup routes");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        repository,
        _temp_dir: temp_dir,
        store_root,
        upload_temp_dir,
    }
}

fn create_test_config(temp_dir: &TempDir, store_root: &PathBuf, upload_temp_dir: &PathBuf) -> Config {
    let base = BaseConfig {
        server_port: 6000,
        environment: "test".to_string(),
        access_token_secret: auth::TEST_ACCESS_TOKEN_SECRET.to_string(),
        log_format: "pretty".to_string(),
        database_url: None,
        db_max_connections: 5,
        db_timeout_seconds: 30,
        auth_max_failures: 3,
        auth_failure_window_secs: 300,
    };

    let pipeline = PipelineSettings {
        max_upload_size_bytes: TEST_MAX_UPLOAD_BYTES,
        upload_temp_dir: upload_temp_dir.clone(),
        workspace_dir: temp_dir.path().join("workspaces"),
        ..PipelineSettings::default()
    };

    let storage = StorageSettings {
        backend: StoreBackend::Local,
        remote_folder: "sharebox".to_string(),
        media_host_cloud_name: None,
        media_host_api_key: None,
        media_host_api_secret: None,
        media_host_api_base: "https://api.cloudinary.com/v1_1".to_string(),
        local_storage_path: Some(store_root.to_string_lossy().into_owned()),
        local_storage_base_url: Some(TEST_BASE_URL.to_string()),
    };

    Config::new(ServiceConfig {
        base,
        pipeline,
        storage,
    })
}
