//! File lifecycle: create, replace and delete records together with their
//! remote objects.
//!
//! Keeps handler logic thin and allows unit testing without HTTP.

use crate::error::storage_error;
use sharebox_core::{AppError, FileRecord, ResourceKind, UploadInput, UploadResult, UploadSource};
use sharebox_db::FileRepository;
use sharebox_processing::{OwnedBuffer, UploadOrchestrator};
use sharebox_storage::RemoteStore;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct FileLifecycleService {
    repository: Arc<dyn FileRepository>,
    orchestrator: Arc<UploadOrchestrator>,
}

impl FileLifecycleService {
    pub fn new(repository: Arc<dyn FileRepository>, orchestrator: Arc<UploadOrchestrator>) -> Self {
        Self {
            repository,
            orchestrator,
        }
    }

    pub fn orchestrator(&self) -> &Arc<UploadOrchestrator> {
        &self.orchestrator
    }

    fn store(&self) -> &Arc<dyn RemoteStore> {
        self.orchestrator.store()
    }

    /// Run the pipeline without persisting anything.
    pub async fn process(&self, input: UploadInput) -> Result<UploadResult, AppError> {
        Ok(self.orchestrator.handle_upload(input).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(&self, owner_id: &str) -> Result<Vec<FileRecord>, AppError> {
        self.repository.list_by_owner(owner_id).await
    }

    /// Upload, then persist. A failed insert reclaims the fresh remote objects.
    #[tracing::instrument(skip(self, input), fields(file.name = %input.original_name()))]
    pub async fn create(&self, owner_id: &str, input: UploadInput) -> Result<FileRecord, AppError> {
        let original_name = input.original_name().to_string();
        let mime_type = Some(input.mime_type.clone());

        let result = self.orchestrator.handle_upload(input).await?;
        let fresh_objects = result.remote_objects();
        let record = FileRecord::from_upload(owner_id, &original_name, mime_type, result);

        match self.repository.create(&record).await {
            Ok(created) => {
                tracing::info!(file_id = %created.id, remote_id = %created.remote_id, "File created");
                Ok(created)
            }
            Err(e) => {
                self.delete_objects_best_effort(&fresh_objects, "record insert failed")
                    .await;
                Err(e)
            }
        }
    }

    /// Replace a record's content: the new upload must succeed before the old
    /// remote objects are touched, and their removal never fails the call.
    #[tracing::instrument(skip(self, input), fields(file_id = %file_id))]
    pub async fn replace(
        &self,
        owner_id: &str,
        file_id: Uuid,
        input: UploadInput,
    ) -> Result<FileRecord, AppError> {
        let mut record = match self.repository.find_for_owner(owner_id, file_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                discard_input(input).await;
                return Err(AppError::NotFound("File not found".to_string()));
            }
            Err(e) => {
                discard_input(input).await;
                return Err(e);
            }
        };

        let original_name = input.original_name().to_string();
        let mime_type = Some(input.mime_type.clone());

        let result = self.orchestrator.handle_upload(input).await?;
        let fresh_objects = result.remote_objects();
        let stale_objects = record.upload_result().remote_objects();
        let expected_remote_id = record.remote_id.clone();

        record.apply_upload(&original_name, mime_type, result);
        let updated = match self
            .repository
            .update_content(&record, &expected_remote_id)
            .await
        {
            Ok(updated) => updated,
            Err(e) => {
                self.delete_objects_best_effort(&fresh_objects, "record update failed")
                    .await;
                return Err(e);
            }
        };

        self.delete_objects_best_effort(&stale_objects, "replaced by new upload")
            .await;

        tracing::info!(remote_id = %updated.remote_id, "File content replaced");
        Ok(updated)
    }

    /// Delete remote objects, then the record. The primary object must go;
    /// derived objects are removed best-effort.
    #[tracing::instrument(skip(self), fields(file_id = %file_id))]
    pub async fn delete(&self, owner_id: &str, file_id: Uuid) -> Result<(), AppError> {
        let record = self
            .repository
            .find_for_owner(owner_id, file_id)
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

        let objects = record.upload_result().remote_objects();
        if let Some(((primary_id, primary_kind), derived)) = objects.split_first() {
            let deleted = self
                .store()
                .delete_object(primary_id, Some(*primary_kind))
                .await
                .map_err(storage_error)?;
            if !deleted {
                return Err(AppError::RemoteDelete(format!(
                    "Store refused to delete {}",
                    primary_id
                )));
            }
            self.delete_objects_best_effort(derived, "file deleted").await;
        }

        if !self.repository.delete(owner_id, file_id).await? {
            return Err(AppError::NotFound("File not found".to_string()));
        }

        tracing::info!("File deleted");
        Ok(())
    }

    /// Delete one remote object by id; true when it is gone.
    #[tracing::instrument(skip(self))]
    pub async fn delete_remote(
        &self,
        remote_id: &str,
        kind_hint: Option<ResourceKind>,
    ) -> Result<bool, AppError> {
        self.store()
            .delete_object(remote_id, kind_hint)
            .await
            .map_err(storage_error)
    }

    async fn delete_objects_best_effort(&self, objects: &[(String, ResourceKind)], reason: &str) {
        for (remote_id, kind) in objects {
            match self.store().delete_object(remote_id, Some(*kind)).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::warn!(remote_id = %remote_id, reason, "Remote object could not be deleted")
                }
                Err(e) => {
                    tracing::warn!(remote_id = %remote_id, reason, error = %e, "Failed to delete remote object")
                }
            }
        }
    }
}

/// Inputs that never reach the pipeline still must not leak their buffer.
async fn discard_input(input: UploadInput) {
    if let UploadSource::BufferedUpload { path, .. } = input.source {
        OwnedBuffer::new(path).discard().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sharebox_core::{MediaProbe, QualityTier, RemoteObject, StoreBackend};
    use sharebox_db::InMemoryFileRepository;
    use sharebox_processing::{
        MediaInspect, OrchestratorSettings, ProcessingError, RenditionTranscoder, TierEncoder,
        TierJob, TranscodeOptions, UploadValidator,
    };
    use sharebox_storage::{DestroyOutcome, LocalStore, StorageError, StorageResult, UploadOptions};
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    struct NoVideo;

    #[async_trait]
    impl MediaInspect for NoVideo {
        async fn probe(&self, _local_path: &Path) -> Result<MediaProbe, ProcessingError> {
            Ok(MediaProbe::non_video())
        }
    }

    struct NoEncoder;

    #[async_trait]
    impl TierEncoder for NoEncoder {
        async fn encode_tier(&self, _job: &TierJob) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("no encoder in this test"))
        }

        async fn extract_poster(&self, _i: &Path, _o: &Path, _t: f64) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("no encoder in this test"))
        }
    }

    /// Local store whose uploads can be switched off.
    struct SwitchableStore {
        inner: LocalStore,
        uploads_enabled: AtomicBool,
    }

    #[async_trait]
    impl RemoteStore for SwitchableStore {
        async fn upload_file(
            &self,
            local_path: &Path,
            options: &UploadOptions,
        ) -> StorageResult<RemoteObject> {
            if !self.uploads_enabled.load(Ordering::SeqCst) {
                return Err(StorageError::UploadFailed("store offline".to_string()));
            }
            self.inner.upload_file(local_path, options).await
        }

        async fn destroy(
            &self,
            remote_id: &str,
            kind: ResourceKind,
        ) -> StorageResult<DestroyOutcome> {
            self.inner.destroy(remote_id, kind).await
        }

        fn backend_type(&self) -> StoreBackend {
            StoreBackend::Local
        }
    }

    /// Repository that serves a fixed snapshot from `find_for_owner`, as a
    /// request that read the record before a concurrent replace would see it.
    struct StaleReads {
        inner: Arc<InMemoryFileRepository>,
        snapshot: FileRecord,
    }

    #[async_trait]
    impl FileRepository for StaleReads {
        async fn create(&self, record: &FileRecord) -> Result<FileRecord, AppError> {
            self.inner.create(record).await
        }

        async fn find_for_owner(
            &self,
            _owner_id: &str,
            _id: Uuid,
        ) -> Result<Option<FileRecord>, AppError> {
            Ok(Some(self.snapshot.clone()))
        }

        async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<FileRecord>, AppError> {
            self.inner.list_by_owner(owner_id).await
        }

        async fn update_content(
            &self,
            record: &FileRecord,
            expected_remote_id: &str,
        ) -> Result<FileRecord, AppError> {
            self.inner.update_content(record, expected_remote_id).await
        }

        async fn delete(&self, owner_id: &str, id: Uuid) -> Result<bool, AppError> {
            self.inner.delete(owner_id, id).await
        }
    }

    fn count_files(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .map(|entries| {
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
            })
            .unwrap_or(0)
    }

    struct Fixture {
        root: TempDir,
        store: Arc<SwitchableStore>,
        service: FileLifecycleService,
        repository: Arc<InMemoryFileRepository>,
    }

    impl Fixture {
        async fn new() -> Self {
            let root = tempfile::tempdir().unwrap();
            let inner = LocalStore::new(root.path().join("store"), "http://test/media".to_string())
                .await
                .unwrap();
            let store = Arc::new(SwitchableStore {
                inner,
                uploads_enabled: AtomicBool::new(true),
            });
            let orchestrator = UploadOrchestrator::new(
                UploadValidator::new(1024 * 1024),
                Arc::new(NoVideo),
                RenditionTranscoder::new(Arc::new(NoEncoder), QualityTier::default_ladder()),
                store.clone(),
                OrchestratorSettings {
                    workspace_dir: root.path().join("work"),
                    remote_folder: "sharebox".to_string(),
                    transcode: TranscodeOptions::default(),
                },
            );
            let repository = Arc::new(InMemoryFileRepository::new());
            let service = FileLifecycleService::new(repository.clone(), Arc::new(orchestrator));
            Self {
                root,
                store,
                service,
                repository,
            }
        }

        fn input(&self, name: &str, body: &[u8]) -> UploadInput {
            let path = self.root.path().join(format!("{}.buf", Uuid::new_v4()));
            let path = path.with_extension(Path::new(name).extension().unwrap());
            std::fs::write(&path, body).unwrap();
            UploadInput::buffered(path, name, "text/plain", body.len() as u64)
        }

        fn object_path(&self, record: &FileRecord) -> std::path::PathBuf {
            self.store
                .inner
                .base_path()
                .join(record.resource_kind.as_str())
                .join(&record.remote_id)
        }
    }

    #[tokio::test]
    async fn test_create_then_delete() {
        let fx = Fixture::new().await;
        let record = fx
            .service
            .create("alice", fx.input("notes.txt", b"hello"))
            .await
            .unwrap();
        assert!(record.name.ends_with("-notes.txt"));
        assert!(fx.object_path(&record).exists());

        fx.service.delete("alice", record.id).await.unwrap();
        assert!(!fx.object_path(&record).exists());
        assert!(fx.repository.is_empty().await);
    }

    #[tokio::test]
    async fn test_replace_deletes_old_object_after_success() {
        let fx = Fixture::new().await;
        let original = fx
            .service
            .create("alice", fx.input("v1.txt", b"one"))
            .await
            .unwrap();

        let replaced = fx
            .service
            .replace("alice", original.id, fx.input("v2.txt", b"two!"))
            .await
            .unwrap();

        assert_eq!(replaced.id, original.id);
        assert_ne!(replaced.remote_id, original.remote_id);
        assert_eq!(replaced.size_bytes, 4);
        assert!(fx.object_path(&replaced).exists());
        assert!(!fx.object_path(&original).exists());
    }

    #[tokio::test]
    async fn test_failed_replace_keeps_old_object() {
        let fx = Fixture::new().await;
        let original = fx
            .service
            .create("alice", fx.input("v1.txt", b"one"))
            .await
            .unwrap();

        fx.store.uploads_enabled.store(false, Ordering::SeqCst);
        let input = fx.input("v2.txt", b"two");
        let buffer = input.local_path().to_path_buf();

        let err = fx
            .service
            .replace("alice", original.id, input)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upload(_)));
        assert!(fx.object_path(&original).exists());
        assert!(!buffer.exists());

        let stored = fx
            .repository
            .find_for_owner("alice", original.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.remote_id, original.remote_id);
    }

    #[tokio::test]
    async fn test_replace_of_foreign_record_is_not_found() {
        let fx = Fixture::new().await;
        let original = fx
            .service
            .create("alice", fx.input("v1.txt", b"one"))
            .await
            .unwrap();
        let input = fx.input("v2.txt", b"two");
        let buffer = input.local_path().to_path_buf();

        let err = fx.service.replace("bob", original.id, input).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(!buffer.exists());
    }

    #[tokio::test]
    async fn test_failed_upload_persists_nothing() {
        let fx = Fixture::new().await;
        fx.store.uploads_enabled.store(false, Ordering::SeqCst);

        let result = fx.service.create("alice", fx.input("a.txt", b"abc")).await;
        assert!(result.is_err());
        assert!(fx.repository.is_empty().await);
    }

    #[tokio::test]
    async fn test_delete_remote_is_idempotent() {
        let fx = Fixture::new().await;
        let result = fx.service.process(fx.input("a.txt", b"abc")).await.unwrap();

        for _ in 0..2 {
            assert!(fx
                .service
                .delete_remote(&result.remote_id, Some(ResourceKind::Image))
                .await
                .unwrap());
        }
    }

    #[tokio::test]
    async fn test_replace_from_stale_snapshot_leaves_no_orphans() {
        let fx = Fixture::new().await;
        let original = fx
            .service
            .create("alice", fx.input("v1.txt", b"one"))
            .await
            .unwrap();

        let stale = Arc::new(StaleReads {
            inner: fx.repository.clone(),
            snapshot: original.clone(),
        });
        let racing = FileLifecycleService::new(stale, fx.service.orchestrator().clone());

        let first = racing
            .replace("alice", original.id, fx.input("v2.txt", b"two"))
            .await
            .unwrap();

        let input = fx.input("v3.txt", b"three");
        let buffer = input.local_path().to_path_buf();
        let err = racing
            .replace("alice", original.id, input)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(!buffer.exists());

        let stored = fx
            .repository
            .find_for_owner("alice", original.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.remote_id, first.remote_id);
        assert!(fx.object_path(&first).exists());
        // Only the winning replace's object remains in the store.
        assert_eq!(count_files(fx.store.inner.base_path()), 1);
    }
}
