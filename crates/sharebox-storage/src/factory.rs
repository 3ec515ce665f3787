#[cfg(feature = "storage-local")]
use crate::LocalStore;
#[cfg(feature = "storage-media-host")]
use crate::MediaHostStore;
use crate::{RemoteStore, StorageError, StorageResult, StoreBackend};
use sharebox_core::StorageSettings;
use std::sync::Arc;

/// Create a remote store based on configuration
pub async fn create_store(settings: &StorageSettings) -> StorageResult<Arc<dyn RemoteStore>> {
    match settings.backend {
        #[cfg(feature = "storage-media-host")]
        StoreBackend::MediaHost => {
            let cloud_name = settings.media_host_cloud_name.clone().ok_or_else(|| {
                StorageError::ConfigError("MEDIA_HOST_CLOUD_NAME not configured".to_string())
            })?;
            let api_key = settings.media_host_api_key.clone().ok_or_else(|| {
                StorageError::ConfigError("MEDIA_HOST_API_KEY not configured".to_string())
            })?;
            let api_secret = settings.media_host_api_secret.clone().ok_or_else(|| {
                StorageError::ConfigError("MEDIA_HOST_API_SECRET not configured".to_string())
            })?;

            let store = MediaHostStore::new(
                cloud_name,
                api_key,
                api_secret,
                settings.media_host_api_base.clone(),
            )?;
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "storage-media-host"))]
        StoreBackend::MediaHost => Err(StorageError::ConfigError(
            "Media host backend not available (storage-media-host feature not enabled)"
                .to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StoreBackend::Local => {
            let base_path = settings.local_storage_path.clone().ok_or_else(|| {
                StorageError::ConfigError("LOCAL_STORAGE_PATH not configured".to_string())
            })?;
            let base_url = settings.local_storage_base_url.clone().ok_or_else(|| {
                StorageError::ConfigError("LOCAL_STORAGE_BASE_URL not configured".to_string())
            })?;

            let store = LocalStore::new(base_path, base_url).await?;
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "storage-local"))]
        StoreBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}
