//! Configuration module
//!
//! This module provides configuration structures for the HTTP service, the
//! upload pipeline and the remote object store.

use std::env;
use std::path::PathBuf;

use crate::constants::DEFAULT_MAX_UPLOAD_SIZE_MB;
use crate::models::QualityTier;
use crate::storage_types::StoreBackend;

// Common constants
const SERVER_PORT: u16 = 6000;
const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const AUTH_MAX_FAILURES: u32 = 10;
const AUTH_FAILURE_WINDOW_SECS: u64 = 300;
const HLS_SEGMENT_DURATION: u64 = 10;
const HLS_MAX_WIDTH: u32 = 1920;
const MEDIA_HOST_API_BASE: &str = "https://api.cloudinary.com/v1_1";
const REMOTE_FOLDER: &str = "sharebox";
const MIN_SECRET_LEN: usize = 32;

/// Settings shared by every part of the service
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub environment: String,
    pub access_token_secret: String,
    pub log_format: String,
    /// Unset selects the in-memory repository.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub auth_max_failures: u32,
    pub auth_failure_window_secs: u64,
}

/// Upload pipeline settings
#[derive(Clone, Debug)]
pub struct PipelineSettings {
    pub max_upload_size_bytes: u64,
    pub upload_temp_dir: PathBuf,
    pub workspace_dir: PathBuf,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub hls_segment_duration: u64,
    pub hls_max_width: u32,
    pub quality_tiers: Vec<QualityTier>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_upload_size_bytes: DEFAULT_MAX_UPLOAD_SIZE_MB * 1024 * 1024,
            upload_temp_dir: PathBuf::from("./public/temp"),
            workspace_dir: env::temp_dir().join("sharebox"),
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            hls_segment_duration: HLS_SEGMENT_DURATION,
            hls_max_width: HLS_MAX_WIDTH,
            quality_tiers: QualityTier::default_ladder(),
        }
    }
}

impl PipelineSettings {
    /// Limit in whole megabytes, as shown to users.
    pub fn max_upload_size_mb(&self) -> u64 {
        self.max_upload_size_bytes / (1024 * 1024)
    }
}

/// Remote object store settings
#[derive(Clone, Debug)]
pub struct StorageSettings {
    pub backend: StoreBackend,
    pub remote_folder: String,
    pub media_host_cloud_name: Option<String>,
    pub media_host_api_key: Option<String>,
    pub media_host_api_secret: Option<String>,
    pub media_host_api_base: String,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
}

/// Full service configuration
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub base: BaseConfig,
    pub pipeline: PipelineSettings,
    pub storage: StorageSettings,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ServiceConfig>);

impl Config {
    fn inner(&self) -> &ServiceConfig {
        &self.0
    }

    pub fn new(config: ServiceConfig) -> Self {
        Config(Box::new(config))
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_name(&self.inner().base.environment)
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = ServiceConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn base(&self) -> &BaseConfig {
        &self.inner().base
    }

    pub fn pipeline(&self) -> &PipelineSettings {
        &self.inner().pipeline
    }

    pub fn storage(&self) -> &StorageSettings {
        &self.inner().storage
    }

    // Convenience getters for common fields
    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn access_token_secret(&self) -> &str {
        &self.inner().base.access_token_secret
    }

    pub fn log_format(&self) -> &str {
        &self.inner().base.log_format
    }

    pub fn database_url(&self) -> Option<&str> {
        self.inner().base.database_url.as_deref()
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().base.db_timeout_seconds
    }

    pub fn auth_max_failures(&self) -> u32 {
        self.inner().base.auth_max_failures
    }

    pub fn auth_failure_window_secs(&self) -> u64 {
        self.inner().base.auth_failure_window_secs
    }

    pub fn max_upload_size_bytes(&self) -> u64 {
        self.inner().pipeline.max_upload_size_bytes
    }

    pub fn upload_temp_dir(&self) -> &PathBuf {
        &self.inner().pipeline.upload_temp_dir
    }

    pub fn storage_backend(&self) -> StoreBackend {
        self.inner().storage.backend
    }

    pub fn remote_folder(&self) -> &str {
        &self.inner().storage.remote_folder
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.inner().storage.local_storage_path.as_deref()
    }
}

fn is_production_name(environment: &str) -> bool {
    let env = environment.to_lowercase();
    env == "production" || env == "prod"
}

/// Tool paths end up as subprocess program names; reject anything shell-like.
fn is_safe_tool_path(path: &str) -> bool {
    const DANGEROUS: &[char] = &[';', '&', '|', '$', '`', '\n', '\r', '<', '>'];
    !path.trim().is_empty() && !path.contains(DANGEROUS)
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment,
            access_token_secret: env::var("ACCESS_TOKEN_SECRET").map_err(|_| {
                anyhow::anyhow!("ACCESS_TOKEN_SECRET must be set for authentication")
            })?,
            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase(),
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            auth_max_failures: env::var("AUTH_MAX_FAILURES")
                .unwrap_or_else(|_| AUTH_MAX_FAILURES.to_string())
                .parse()
                .unwrap_or(AUTH_MAX_FAILURES),
            auth_failure_window_secs: env::var("AUTH_FAILURE_WINDOW_SECS")
                .unwrap_or_else(|_| AUTH_FAILURE_WINDOW_SECS.to_string())
                .parse()
                .unwrap_or(AUTH_FAILURE_WINDOW_SECS),
        };

        let defaults = PipelineSettings::default();
        let quality_tiers = match env::var("HLS_TIERS") {
            Ok(spec) if !spec.trim().is_empty() => QualityTier::parse_ladder(&spec)
                .map_err(|e| anyhow::anyhow!("HLS_TIERS is invalid: {}", e))?,
            _ => defaults.quality_tiers,
        };

        let pipeline = PipelineSettings {
            max_upload_size_bytes: env::var("MAX_UPLOAD_SIZE_MB")
                .unwrap_or_else(|_| DEFAULT_MAX_UPLOAD_SIZE_MB.to_string())
                .parse::<u64>()
                .unwrap_or(DEFAULT_MAX_UPLOAD_SIZE_MB)
                * 1024
                * 1024,
            upload_temp_dir: env::var("UPLOAD_TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_temp_dir),
            workspace_dir: env::var("WORKSPACE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.workspace_dir),
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or(defaults.ffmpeg_path),
            ffprobe_path: env::var("FFPROBE_PATH").unwrap_or(defaults.ffprobe_path),
            hls_segment_duration: env::var("HLS_SEGMENT_DURATION")
                .unwrap_or_else(|_| HLS_SEGMENT_DURATION.to_string())
                .parse()
                .unwrap_or(HLS_SEGMENT_DURATION),
            hls_max_width: env::var("HLS_MAX_WIDTH")
                .unwrap_or_else(|_| HLS_MAX_WIDTH.to_string())
                .parse()
                .unwrap_or(HLS_MAX_WIDTH),
            quality_tiers,
        };

        let backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse::<StoreBackend>()?,
            Err(_) => StoreBackend::MediaHost,
        };

        let storage = StorageSettings {
            backend,
            remote_folder: env::var("REMOTE_FOLDER").unwrap_or_else(|_| REMOTE_FOLDER.to_string()),
            media_host_cloud_name: env::var("MEDIA_HOST_CLOUD_NAME")
                .ok()
                .filter(|s| !s.is_empty()),
            media_host_api_key: env::var("MEDIA_HOST_API_KEY")
                .ok()
                .filter(|s| !s.is_empty()),
            media_host_api_secret: env::var("MEDIA_HOST_API_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
            media_host_api_base: env::var("MEDIA_HOST_API_BASE")
                .unwrap_or_else(|_| MEDIA_HOST_API_BASE.to_string()),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
        };

        let config = ServiceConfig {
            base,
            pipeline,
            storage,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.base.access_token_secret.len() < MIN_SECRET_LEN {
            return Err(anyhow::anyhow!(
                "ACCESS_TOKEN_SECRET must be at least {} characters long",
                MIN_SECRET_LEN
            ));
        }

        match &self.base.database_url {
            Some(url) => {
                if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be a valid PostgreSQL connection string"
                    ));
                }
            }
            None => {
                if is_production_name(&self.base.environment) {
                    return Err(anyhow::anyhow!("DATABASE_URL must be set in production"));
                }
            }
        }

        if self.pipeline.max_upload_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_SIZE_MB must be greater than 0"));
        }

        if self.pipeline.hls_segment_duration == 0 {
            return Err(anyhow::anyhow!("HLS_SEGMENT_DURATION must be greater than 0"));
        }

        if self.pipeline.quality_tiers.is_empty() {
            return Err(anyhow::anyhow!("HLS_TIERS must contain at least one tier"));
        }

        if !is_safe_tool_path(&self.pipeline.ffmpeg_path) {
            return Err(anyhow::anyhow!("FFMPEG_PATH contains invalid characters"));
        }

        if !is_safe_tool_path(&self.pipeline.ffprobe_path) {
            return Err(anyhow::anyhow!("FFPROBE_PATH contains invalid characters"));
        }

        // Validate storage backend configuration
        match self.storage.backend {
            StoreBackend::MediaHost => {
                if self.storage.media_host_cloud_name.is_none()
                    || self.storage.media_host_api_key.is_none()
                    || self.storage.media_host_api_secret.is_none()
                {
                    return Err(anyhow::anyhow!(
                        "MEDIA_HOST_CLOUD_NAME, MEDIA_HOST_API_KEY and MEDIA_HOST_API_SECRET must be set when using the media-host storage backend"
                    ));
                }
            }
            StoreBackend::Local => {
                if self.storage.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.storage.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }
}
