use crate::keys;
use crate::traits::{DestroyOutcome, RemoteStore, StorageError, StorageResult, UploadOptions};
use crate::StoreBackend;
use async_trait::async_trait;
use sharebox_core::{RemoteObject, ResourceKind};
use std::path::{Path, PathBuf};
use tokio::fs;

const ALL_KINDS: [ResourceKind; 3] = [ResourceKind::Image, ResourceKind::Video, ResourceKind::Raw];

/// Local filesystem store
///
/// Objects live at `{base_path}/{kind}/{remote_id}` and are served from
/// `{base_url}/{kind}/{remote_id}`. Like the media host, an object can only
/// be destroyed under the kind it was stored as.
#[derive(Clone)]
pub struct LocalStore {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStore {
    /// Create a new LocalStore instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for stored objects (e.g., "/var/lib/sharebox/media")
    /// * `base_url` - Base URL the objects are served from (e.g., "http://localhost:6000/media")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStore {
            base_path,
            base_url,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn object_path(&self, kind: ResourceKind, remote_id: &str) -> StorageResult<PathBuf> {
        keys::validate_remote_id(remote_id)?;
        Ok(self.base_path.join(kind.as_str()).join(remote_id))
    }

    fn generate_url(&self, kind: ResourceKind, remote_id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            kind.as_str(),
            remote_id
        )
    }

    async fn write_object(&self, source: &Path, destination: &Path) -> StorageResult<u64> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Written under a temporary name so a failed copy never looks like an object.
        let mut partial_name = destination
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        partial_name.push(".partial");
        let partial = destination.with_file_name(partial_name);
        let result = async {
            let mut reader = fs::File::open(source).await.map_err(|e| {
                StorageError::UploadFailed(format!("Failed to open {}: {}", source.display(), e))
            })?;
            let mut file = fs::File::create(&partial).await.map_err(|e| {
                StorageError::UploadFailed(format!(
                    "Failed to create file {}: {}",
                    partial.display(),
                    e
                ))
            })?;
            let bytes = tokio::io::copy(&mut reader, &mut file).await.map_err(|e| {
                StorageError::UploadFailed(format!(
                    "Failed to write file {}: {}",
                    partial.display(),
                    e
                ))
            })?;
            file.sync_all().await.map_err(|e| {
                StorageError::UploadFailed(format!(
                    "Failed to sync file {}: {}",
                    partial.display(),
                    e
                ))
            })?;
            fs::rename(&partial, destination).await.map_err(|e| {
                StorageError::UploadFailed(format!(
                    "Failed to move file into place {}: {}",
                    destination.display(),
                    e
                ))
            })?;
            Ok::<u64, StorageError>(bytes)
        }
        .await;

        if result.is_err() {
            let _ = fs::remove_file(&partial).await;
        }
        result
    }
}

#[async_trait]
impl RemoteStore for LocalStore {
    async fn upload_file(
        &self,
        local_path: &Path,
        options: &UploadOptions,
    ) -> StorageResult<RemoteObject> {
        let name = keys::object_name(local_path, options.preserve_name)?;
        let remote_id = keys::remote_id(options.folder.as_deref(), &name);
        let kind = options.kind.unwrap_or_else(|| {
            keys::extension(&name)
                .map(|ext| ResourceKind::from_extension(&ext))
                .unwrap_or(ResourceKind::Raw)
        });
        let path = self.object_path(kind, &remote_id)?;
        let start = std::time::Instant::now();

        let size_bytes = self.write_object(local_path, &path).await?;
        let url = self.generate_url(kind, &remote_id);

        tracing::info!(
            path = %path.display(),
            remote_id = %remote_id,
            kind = %kind,
            size_bytes = size_bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local store upload successful"
        );

        Ok(RemoteObject {
            remote_id,
            url,
            size_bytes,
            resource_kind: kind,
            format: keys::extension(&name),
        })
    }

    async fn destroy(&self, remote_id: &str, kind: ResourceKind) -> StorageResult<DestroyOutcome> {
        let path = self.object_path(kind, remote_id)?;

        if fs::try_exists(&path).await.unwrap_or(false) {
            fs::remove_file(&path).await.map_err(|e| {
                StorageError::DeleteFailed(format!(
                    "Failed to delete file {}: {}",
                    path.display(),
                    e
                ))
            })?;
            tracing::info!(
                path = %path.display(),
                remote_id = %remote_id,
                kind = %kind,
                "Local store delete successful"
            );
            return Ok(DestroyOutcome::Deleted);
        }

        for other in ALL_KINDS.into_iter().filter(|k| *k != kind) {
            let other_path = self.object_path(other, remote_id)?;
            if fs::try_exists(&other_path).await.unwrap_or(false) {
                return Err(StorageError::KindMismatch(format!(
                    "{} is stored as {}, not {}",
                    remote_id, other, kind
                )));
            }
        }

        Ok(DestroyOutcome::NotFound)
    }

    fn backend_type(&self) -> StoreBackend {
        StoreBackend::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn store(root: &Path) -> LocalStore {
        LocalStore::new(root.join("media"), "http://localhost:6000/media/".to_string())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_upload_auto_kind_and_url() {
        let dir = tempdir().unwrap();
        let store = store(dir.path()).await;
        let source = dir.path().join("photo.png");
        std::fs::write(&source, b"png bytes").unwrap();

        let object = store
            .upload_file(&source, &UploadOptions::auto().in_folder("sharebox"))
            .await
            .unwrap();

        assert_eq!(object.resource_kind, ResourceKind::Image);
        assert_eq!(object.size_bytes, 9);
        assert_eq!(object.format.as_deref(), Some("png"));
        assert!(object.remote_id.starts_with("sharebox/"));
        assert_eq!(
            object.url,
            format!("http://localhost:6000/media/image/{}", object.remote_id)
        );
        assert!(store
            .base_path()
            .join("image")
            .join(&object.remote_id)
            .exists());
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_upload_missing_source_fails_without_leftovers() {
        let dir = tempdir().unwrap();
        let store = store(dir.path()).await;

        let result = store
            .upload_file(
                &dir.path().join("missing.pdf"),
                &UploadOptions::auto().preserving_name(),
            )
            .await;

        assert!(matches!(result, Err(StorageError::UploadFailed(_))));
        assert!(!store.base_path().join("raw").join("missing.pdf").exists());
        assert!(!store.base_path().join("raw").join("missing.pdf.partial").exists());
    }

    #[tokio::test]
    async fn test_destroy_reports_kind_mismatch() {
        let dir = tempdir().unwrap();
        let store = store(dir.path()).await;
        let source = dir.path().join("notes.txt");
        std::fs::write(&source, b"hello").unwrap();

        let object = store
            .upload_file(&source, &UploadOptions::auto().preserving_name())
            .await
            .unwrap();
        assert_eq!(object.resource_kind, ResourceKind::Raw);

        let result = store.destroy(&object.remote_id, ResourceKind::Image).await;
        assert!(matches!(result, Err(StorageError::KindMismatch(_))));

        assert!(store.delete_object(&object.remote_id, None).await.unwrap());
        assert_eq!(
            store
                .destroy(&object.remote_id, ResourceKind::Raw)
                .await
                .unwrap(),
            DestroyOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let store = store(dir.path()).await;

        let result = store.destroy("../../etc/passwd", ResourceKind::Raw).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let source = dir.path().join("a.txt");
        std::fs::write(&source, b"a").unwrap();
        let result = store
            .upload_file(
                &source,
                &UploadOptions::auto().in_folder("../escape").preserving_name(),
            )
            .await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }
}
