//! Remote object store abstraction
//!
//! This module defines the `RemoteStore` trait that all storage backends must implement.

use crate::StoreBackend;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use sharebox_core::{RemoteObject, ResourceKind};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Number of files of one directory upload in flight at a time.
pub const DIRECTORY_UPLOAD_CONCURRENCY: usize = 8;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    /// The store files the object under a different resource kind.
    #[error("Resource kind mismatch: {0}")]
    KindMismatch(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid remote id: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// How a single upload should be filed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOptions {
    /// `None` lets the store pick the kind from the content.
    pub kind: Option<ResourceKind>,
    pub folder: Option<String>,
    /// Keep the local file name as the object name instead of generating one.
    pub preserve_name: bool,
}

impl UploadOptions {
    pub fn auto() -> Self {
        Self::default()
    }

    pub fn with_kind(mut self, kind: ResourceKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn in_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    pub fn preserving_name(mut self) -> Self {
        self.preserve_name = true;
        self
    }
}

/// Outcome of a single destroy call. Both outcomes count as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyOutcome {
    Deleted,
    NotFound,
}

/// Remote object store trait
///
/// Backends implement `upload_file` and `destroy`; directory uploads and
/// kind-retrying deletes are built on top of them.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Upload one local file. Never yields a partially stored object.
    async fn upload_file(
        &self,
        local_path: &Path,
        options: &UploadOptions,
    ) -> StorageResult<RemoteObject>;

    /// Destroy one object filed under `kind`.
    ///
    /// Returns `StorageError::KindMismatch` when the store rejects the kind.
    async fn destroy(&self, remote_id: &str, kind: ResourceKind) -> StorageResult<DestroyOutcome>;

    /// Get the storage backend type
    fn backend_type(&self) -> StoreBackend;

    /// Upload every regular file under `dir`, keeping relative paths under
    /// `options.folder`.
    ///
    /// Uploads run concurrently. If any file fails, the objects that did
    /// make it are deleted again (best effort) and the call fails.
    async fn upload_directory(
        &self,
        dir: &Path,
        options: &UploadOptions,
    ) -> StorageResult<Vec<RemoteObject>> {
        let files = collect_files(dir).await?;
        let total = files.len();
        let start = std::time::Instant::now();

        let results: Vec<(PathBuf, StorageResult<RemoteObject>)> = stream::iter(files)
            .map(|relative| {
                let local_path = dir.join(&relative);
                let file_options = UploadOptions {
                    folder: nested_folder(options.folder.as_deref(), &relative),
                    ..options.clone()
                };
                async move {
                    let result = self.upload_file(&local_path, &file_options).await;
                    (relative, result)
                }
            })
            .buffered(DIRECTORY_UPLOAD_CONCURRENCY)
            .collect()
            .await;

        let mut uploaded = Vec::with_capacity(total);
        let mut failures = Vec::new();
        for (relative, result) in results {
            match result {
                Ok(object) => uploaded.push(object),
                Err(e) => failures.push(format!("{}: {}", relative.display(), e)),
            }
        }

        if failures.is_empty() {
            tracing::info!(
                dir = %dir.display(),
                file_count = total,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Directory upload successful"
            );
            return Ok(uploaded);
        }

        tracing::error!(
            dir = %dir.display(),
            failed = failures.len(),
            succeeded = uploaded.len(),
            "Directory upload failed, removing uploaded objects"
        );

        for object in &uploaded {
            match self
                .delete_object(&object.remote_id, Some(object.resource_kind))
                .await
            {
                Ok(true) => {}
                Ok(false) => tracing::warn!(
                    remote_id = %object.remote_id,
                    "Could not remove orphaned object"
                ),
                Err(e) => tracing::warn!(
                    remote_id = %object.remote_id,
                    error = %e,
                    "Could not remove orphaned object"
                ),
            }
        }

        Err(StorageError::UploadFailed(format!(
            "{} of {} files failed to upload: {}",
            failures.len(),
            total,
            failures.join("; ")
        )))
    }

    /// Delete an object, retrying once under the alternate kind on mismatch.
    ///
    /// "Not found" counts as success, so deleting twice returns `true` both
    /// times. Returns `false` when both kinds were rejected.
    async fn delete_object(
        &self,
        remote_id: &str,
        kind_hint: Option<ResourceKind>,
    ) -> StorageResult<bool> {
        if remote_id.trim().is_empty() {
            return Err(StorageError::InvalidKey(
                "No remote id provided for deletion".to_string(),
            ));
        }

        let first = kind_hint.unwrap_or(ResourceKind::Image);
        match self.destroy(remote_id, first).await {
            Ok(outcome) => {
                tracing::debug!(remote_id = %remote_id, kind = %first, ?outcome, "Remote object deleted");
                return Ok(true);
            }
            Err(StorageError::KindMismatch(reason)) => {
                tracing::debug!(
                    remote_id = %remote_id,
                    kind = %first,
                    reason = %reason,
                    "Kind mismatch on delete, retrying with alternate kind"
                );
            }
            Err(e) => return Err(e),
        }

        let alternate = first.alternate();
        match self.destroy(remote_id, alternate).await {
            Ok(outcome) => {
                tracing::debug!(remote_id = %remote_id, kind = %alternate, ?outcome, "Remote object deleted");
                Ok(true)
            }
            Err(StorageError::KindMismatch(reason)) => {
                tracing::warn!(
                    remote_id = %remote_id,
                    reason = %reason,
                    "Remote object rejected under both kinds"
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

/// Relative paths of every regular file under `dir`, sorted.
pub(crate) async fn collect_files(dir: &Path) -> StorageResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![PathBuf::new()];

    while let Some(relative_dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(dir.join(&relative_dir)).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            let relative = relative_dir.join(entry.file_name());
            if file_type.is_dir() {
                pending.push(relative);
            } else if file_type.is_file() {
                files.push(relative);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Folder for a file at `relative` under a directory uploaded into `base`.
fn nested_folder(base: Option<&str>, relative: &Path) -> Option<String> {
    let mut parts: Vec<String> = base
        .map(|b| b.trim_matches('/'))
        .filter(|b| !b.is_empty())
        .map(|b| vec![b.to_string()])
        .unwrap_or_default();

    if let Some(parent) = relative.parent() {
        parts.extend(
            parent
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned()),
        );
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory store whose objects have fixed kinds.
    #[derive(Default)]
    struct FakeStore {
        objects: Mutex<HashMap<String, ResourceKind>>,
        fail_uploads_named: Option<String>,
    }

    #[async_trait]
    impl RemoteStore for FakeStore {
        async fn upload_file(
            &self,
            local_path: &Path,
            options: &UploadOptions,
        ) -> StorageResult<RemoteObject> {
            let name = local_path.file_name().unwrap().to_string_lossy().to_string();
            if self.fail_uploads_named.as_deref() == Some(name.as_str()) {
                return Err(StorageError::UploadFailed(format!("{} rejected", name)));
            }
            let remote_id = match &options.folder {
                Some(folder) => format!("{}/{}", folder, name),
                None => name,
            };
            let kind = options.kind.unwrap_or(ResourceKind::Raw);
            self.objects.lock().unwrap().insert(remote_id.clone(), kind);
            Ok(RemoteObject {
                url: format!("https://cdn.example/{}", remote_id),
                remote_id,
                size_bytes: 1,
                resource_kind: kind,
                format: None,
            })
        }

        async fn destroy(
            &self,
            remote_id: &str,
            kind: ResourceKind,
        ) -> StorageResult<DestroyOutcome> {
            let mut objects = self.objects.lock().unwrap();
            match objects.get(remote_id).copied() {
                None => Ok(DestroyOutcome::NotFound),
                Some(stored) if stored == kind => {
                    objects.remove(remote_id);
                    Ok(DestroyOutcome::Deleted)
                }
                Some(stored) => Err(StorageError::KindMismatch(format!(
                    "stored as {}",
                    stored
                ))),
            }
        }

        fn backend_type(&self) -> StoreBackend {
            StoreBackend::Local
        }
    }

    fn write_tree(root: &Path, files: &[&str]) {
        for file in files {
            let path = root.join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, b"x").unwrap();
        }
    }

    #[test]
    fn test_nested_folder() {
        assert_eq!(
            nested_folder(Some("base/hls"), Path::new("720p/index.m3u8")),
            Some("base/hls/720p".to_string())
        );
        assert_eq!(
            nested_folder(Some("base"), Path::new("master.m3u8")),
            Some("base".to_string())
        );
        assert_eq!(nested_folder(None, Path::new("master.m3u8")), None);
    }

    #[tokio::test]
    async fn test_upload_directory_keeps_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(
            dir.path(),
            &["master.m3u8", "720p/index.m3u8", "720p/segment_000.ts"],
        );

        let store = FakeStore::default();
        let options = UploadOptions::auto()
            .with_kind(ResourceKind::Raw)
            .in_folder("sharebox/hls/clip")
            .preserving_name();
        let objects = store.upload_directory(dir.path(), &options).await.unwrap();

        let ids: Vec<&str> = objects.iter().map(|o| o.remote_id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "sharebox/hls/clip/720p/index.m3u8",
                "sharebox/hls/clip/720p/segment_000.ts",
                "sharebox/hls/clip/master.m3u8",
            ]
        );
    }

    #[tokio::test]
    async fn test_upload_directory_failure_removes_uploaded_objects() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(dir.path(), &["a.ts", "b.ts", "c.ts", "d.ts", "e.ts"]);

        let store = FakeStore {
            fail_uploads_named: Some("c.ts".to_string()),
            ..Default::default()
        };
        let result = store
            .upload_directory(dir.path(), &UploadOptions::auto().preserving_name())
            .await;

        assert!(matches!(result, Err(StorageError::UploadFailed(_))));
        assert!(store.objects.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_object_is_idempotent() {
        let store = FakeStore::default();
        store
            .objects
            .lock()
            .unwrap()
            .insert("doc".to_string(), ResourceKind::Image);

        assert!(store.delete_object("doc", None).await.unwrap());
        assert!(store.delete_object("doc", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_object_retries_with_alternate_kind() {
        let store = FakeStore::default();
        store
            .objects
            .lock()
            .unwrap()
            .insert("report.pdf".to_string(), ResourceKind::Raw);

        assert!(store
            .delete_object("report.pdf", Some(ResourceKind::Image))
            .await
            .unwrap());
        assert!(store.objects.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_object_gives_up_after_one_retry() {
        let store = FakeStore::default();
        store
            .objects
            .lock()
            .unwrap()
            .insert("clip".to_string(), ResourceKind::Video);

        // image -> raw, never video
        assert!(!store.delete_object("clip", None).await.unwrap());
        assert!(store.delete_object("", None).await.is_err());
    }
}
