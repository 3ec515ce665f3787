//! Upload orchestration: validate → classify → (upload | transcode → upload) → result.

use sharebox_core::constants::MASTER_MANIFEST_NAME;
use sharebox_core::{
    Config, MediaProbe, RemoteObject, ResourceKind, StreamEntry, UploadInput, UploadResult,
    UploadSource,
};
use sharebox_storage::{RemoteStore, UploadOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use super::stage::{StageTracker, UploadStage};
use crate::error::ProcessingError;
use crate::validator::UploadValidator;
use crate::video::{
    is_video_path, FfmpegEncoder, FfprobeInspector, MediaInspect, RenditionTranscoder,
    TranscodeOptions,
};
use crate::workspace::{ensure_dir, OwnedBuffer, ScopedWorkspace};

const POSTER_FILE_NAME: &str = "poster.jpg";

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub workspace_dir: PathBuf,
    /// Base folder of every remote object.
    pub remote_folder: String,
    pub transcode: TranscodeOptions,
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> Self {
        let pipeline = config.pipeline();
        Self {
            workspace_dir: pipeline.workspace_dir.clone(),
            remote_folder: config.remote_folder().to_string(),
            transcode: TranscodeOptions {
                segment_duration: pipeline.hls_segment_duration,
                max_width: pipeline.hls_max_width,
            },
        }
    }
}

/// Runs one inbound file through the pipeline
pub struct UploadOrchestrator {
    validator: UploadValidator,
    inspector: Arc<dyn MediaInspect>,
    transcoder: RenditionTranscoder,
    store: Arc<dyn RemoteStore>,
    settings: OrchestratorSettings,
}

impl UploadOrchestrator {
    pub fn new(
        validator: UploadValidator,
        inspector: Arc<dyn MediaInspect>,
        transcoder: RenditionTranscoder,
        store: Arc<dyn RemoteStore>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            validator,
            inspector,
            transcoder,
            store,
            settings,
        }
    }

    /// Wire the ffmpeg-backed inspector and encoder from configuration.
    pub fn from_config(config: &Config, store: Arc<dyn RemoteStore>) -> anyhow::Result<Self> {
        let pipeline = config.pipeline();
        let inspector = FfprobeInspector::new(pipeline.ffprobe_path.clone())?;
        let encoder = FfmpegEncoder::new(pipeline.ffmpeg_path.clone())?;

        Ok(Self::new(
            UploadValidator::new(pipeline.max_upload_size_bytes),
            Arc::new(inspector),
            RenditionTranscoder::new(Arc::new(encoder), pipeline.quality_tiers.clone()),
            store,
            OrchestratorSettings::from_config(config),
        ))
    }

    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    pub fn validator(&self) -> &UploadValidator {
        &self.validator
    }

    /// Process one upload.
    ///
    /// A buffered input is deleted before this returns, whatever the outcome.
    /// The scratch workspace of a video upload never outlives the call.
    #[tracing::instrument(skip(self, input), fields(
        file.name = %input.original_name(),
        file.size = input.size_bytes,
        file.mime_type = %input.mime_type
    ))]
    pub async fn handle_upload(&self, input: UploadInput) -> Result<UploadResult, ProcessingError> {
        let buffer = match &input.source {
            UploadSource::BufferedUpload { path, .. } => OwnedBuffer::new(path.clone()),
            UploadSource::LocalPath(_) => OwnedBuffer::none(),
        };

        let mut tracker = StageTracker::new(Uuid::new_v4());
        let result = self.run(&input, &mut tracker).await;

        match &result {
            Ok(upload) => {
                tracker.advance(UploadStage::Completed);
                tracing::info!(
                    remote_id = %upload.remote_id,
                    adaptive = upload.is_adaptive_stream,
                    size_bytes = upload.size_bytes,
                    "Upload completed"
                );
            }
            Err(e) => {
                tracing::error!(error = %e, stage = %tracker.current(), "Upload aborted");
                tracker.advance(UploadStage::Aborted);
            }
        }

        buffer.discard().await;
        result
    }

    async fn run(
        &self,
        input: &UploadInput,
        tracker: &mut StageTracker,
    ) -> Result<UploadResult, ProcessingError> {
        self.validator.validate(input).await?;
        tracker.advance(UploadStage::Validated);

        let path = input.local_path();
        if !is_video_path(path) {
            tracker.advance(UploadStage::Direct);
            return self.upload_direct(path, tracker).await;
        }

        tracker.advance(UploadStage::Probing);
        let probe = self.inspector.probe(path).await?;
        if !probe.is_video {
            return Err(ProcessingError::MediaProbe(format!(
                "{} is not a decodable video",
                input.original_name()
            )));
        }

        tracker.advance(UploadStage::Transcoding);
        let workspace = ScopedWorkspace::acquire(&self.settings.workspace_dir)
            .await
            .map_err(|e| ProcessingError::Pipeline(format!("Failed to create workspace: {}", e)))?;

        let outcome = self
            .transcode_and_upload(input, &probe, workspace.path(), tracker)
            .await;

        workspace.release().await;
        outcome
    }

    async fn upload_direct(
        &self,
        path: &Path,
        tracker: &mut StageTracker,
    ) -> Result<UploadResult, ProcessingError> {
        tracker.advance(UploadStage::Uploading);

        let options = UploadOptions::auto().in_folder(self.settings.remote_folder.clone());
        let object = self.store.upload_file(path, &options).await?;

        Ok(UploadResult {
            url: object.url,
            remote_id: object.remote_id,
            resource_kind: object.resource_kind,
            format: object.format,
            size_bytes: object.size_bytes,
            width: None,
            height: None,
            duration_seconds: None,
            thumbnail_url: None,
            thumbnail_remote_id: None,
            is_adaptive_stream: false,
            stream_entries: None,
        })
    }

    async fn transcode_and_upload(
        &self,
        input: &UploadInput,
        probe: &MediaProbe,
        workspace: &Path,
        tracker: &mut StageTracker,
    ) -> Result<UploadResult, ProcessingError> {
        let path = input.local_path();
        let rendition_root = ensure_dir(&workspace.join("hls")).await?;

        let renditions = self
            .transcoder
            .transcode(path, probe, &rendition_root, &self.settings.transcode)
            .await?;

        tracker.advance(UploadStage::Uploading);

        let folder = self.stream_folder(input);
        let options = UploadOptions::auto()
            .with_kind(ResourceKind::Raw)
            .in_folder(folder.clone())
            .preserving_name();
        let objects = self.store.upload_directory(&rendition_root, &options).await?;

        let Some(master) = objects
            .iter()
            .find(|object| object.file_name() == MASTER_MANIFEST_NAME)
            .cloned()
        else {
            self.discard_objects(&objects).await;
            return Err(ProcessingError::Pipeline(
                "Master playlist missing from uploaded renditions".to_string(),
            ));
        };

        let stream_entries: Vec<StreamEntry> = objects
            .iter()
            .filter(|object| object.remote_id != master.remote_id)
            .map(|object| StreamEntry {
                tier_name: tier_name_of(&folder, &object.remote_id),
                url: object.url.clone(),
                remote_id: object.remote_id.clone(),
            })
            .collect();
        let size_bytes = objects.iter().map(|object| object.size_bytes).sum();

        tracing::info!(
            tiers = renditions.tiers.len(),
            objects = objects.len(),
            folder = %folder,
            "Renditions uploaded"
        );

        let poster = self.upload_poster(path, probe, workspace, &folder).await;

        Ok(UploadResult {
            url: master.url,
            remote_id: master.remote_id,
            resource_kind: ResourceKind::Video,
            format: Some("m3u8".to_string()),
            size_bytes,
            width: probe.width,
            height: probe.height,
            duration_seconds: probe.duration_seconds,
            thumbnail_url: poster.as_ref().map(|p| p.url.clone()),
            thumbnail_remote_id: poster.map(|p| p.remote_id),
            is_adaptive_stream: true,
            stream_entries: Some(stream_entries),
        })
    }

    /// Best effort: a missing poster never fails the upload.
    async fn upload_poster(
        &self,
        path: &Path,
        probe: &MediaProbe,
        workspace: &Path,
        folder: &str,
    ) -> Option<RemoteObject> {
        let poster_path = workspace.join(POSTER_FILE_NAME);
        if let Err(e) = self
            .transcoder
            .extract_poster(path, &poster_path, probe)
            .await
        {
            tracing::warn!(error = %e, "Poster extraction failed");
            return None;
        }

        let options = UploadOptions::auto()
            .with_kind(ResourceKind::Image)
            .in_folder(folder.to_string())
            .preserving_name();
        match self.store.upload_file(&poster_path, &options).await {
            Ok(object) => Some(object),
            Err(e) => {
                tracing::warn!(error = %e, "Poster upload failed");
                None
            }
        }
    }

    async fn discard_objects(&self, objects: &[RemoteObject]) {
        for object in objects {
            if let Err(e) = self
                .store
                .delete_object(&object.remote_id, Some(object.resource_kind))
                .await
            {
                tracing::warn!(remote_id = %object.remote_id, error = %e, "Failed to remove orphaned object");
            }
        }
    }

    /// `{remote_folder}/hls/{source stem}`
    fn stream_folder(&self, input: &UploadInput) -> String {
        let stem = input
            .local_path()
            .file_stem()
            .and_then(|s| s.to_str())
            .map(sanitize_segment)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        format!("{}/hls/{}", self.settings.remote_folder.trim_matches('/'), stem)
    }
}

fn sanitize_segment(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// First path component below `folder`: the tier directory.
fn tier_name_of(folder: &str, remote_id: &str) -> String {
    remote_id
        .strip_prefix(folder)
        .map(|rest| rest.trim_start_matches('/'))
        .and_then(|rest| rest.split('/').next())
        .unwrap_or(remote_id)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::transcoder::tests::FakeEncoder;
    use async_trait::async_trait;
    use sharebox_core::QualityTier;
    use sharebox_storage::{DestroyOutcome, LocalStore, StorageError, StorageResult, StoreBackend};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const MIB: u64 = 1024 * 1024;

    struct FakeInspector {
        width: u32,
        height: u32,
    }

    #[async_trait]
    impl MediaInspect for FakeInspector {
        async fn probe(&self, _local_path: &Path) -> Result<MediaProbe, ProcessingError> {
            Ok(MediaProbe {
                is_video: true,
                width: Some(self.width),
                height: Some(self.height),
                duration_seconds: Some(30.0),
                frame_rate: Some(25.0),
            })
        }
    }

    /// Local store that rejects uploads whose file name contains `fail_on`.
    struct FlakyStore {
        inner: LocalStore,
        fail_on: String,
        uploads: AtomicUsize,
    }

    #[async_trait]
    impl RemoteStore for FlakyStore {
        async fn upload_file(
            &self,
            local_path: &Path,
            options: &UploadOptions,
        ) -> StorageResult<RemoteObject> {
            self.uploads.fetch_add(1, Ordering::SeqCst);
            let name = local_path.file_name().unwrap().to_string_lossy().to_string();
            if name.contains(&self.fail_on) {
                return Err(StorageError::UploadFailed(format!("{} rejected", name)));
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

    struct Harness {
        root: TempDir,
        store: Arc<LocalStore>,
    }

    impl Harness {
        async fn new() -> Self {
            let root = tempfile::tempdir().unwrap();
            let store = LocalStore::new(
                root.path().join("store"),
                "http://localhost:6000/media".to_string(),
            )
            .await
            .unwrap();
            Self {
                root,
                store: Arc::new(store),
            }
        }

        fn workspace_root(&self) -> PathBuf {
            self.root.path().join("workspaces")
        }

        fn orchestrator(
            &self,
            store: Arc<dyn RemoteStore>,
            encoder: FakeEncoder,
            source: (u32, u32),
        ) -> UploadOrchestrator {
            UploadOrchestrator::new(
                UploadValidator::new(100 * MIB),
                Arc::new(FakeInspector {
                    width: source.0,
                    height: source.1,
                }),
                RenditionTranscoder::new(Arc::new(encoder), QualityTier::default_ladder()),
                store,
                OrchestratorSettings {
                    workspace_dir: self.workspace_root(),
                    remote_folder: "sharebox".to_string(),
                    transcode: TranscodeOptions::default(),
                },
            )
        }

        fn buffered(&self, file_name: &str, original_name: &str, mime: &str) -> UploadInput {
            let dir = self.root.path().join("temp");
            std::fs::create_dir_all(&dir).unwrap();
            let path = dir.join(file_name);
            std::fs::write(&path, b"payload").unwrap();
            UploadInput::buffered(path, original_name, mime, 7)
        }

        fn workspace_is_empty(&self) -> bool {
            match std::fs::read_dir(self.workspace_root()) {
                Ok(entries) => entries.count() == 0,
                Err(_) => true,
            }
        }

        fn stored_files(&self) -> usize {
            fn count(dir: &Path) -> usize {
                std::fs::read_dir(dir)
                    .map(|entries| {
                        entries
                            .flatten()
                            .map(|e| {
                                let path = e.path();
                                if path.is_dir() {
                                    count(&path)
                                } else {
                                    1
                                }
                            })
                            .sum()
                    })
                    .unwrap_or(0)
            }
            count(self.store.base_path())
        }
    }

    #[tokio::test]
    async fn test_non_video_upload_is_single_object() {
        let harness = Harness::new().await;
        let orchestrator = harness.orchestrator(harness.store.clone(), FakeEncoder::default(), (0, 0));
        let input = harness.buffered("abc.pdf", "report.pdf", "application/pdf");
        let buffer_path = input.local_path().to_path_buf();

        let result = orchestrator.handle_upload(input).await.unwrap();

        assert!(!result.is_adaptive_stream);
        assert!(result.stream_entries.is_none());
        assert_eq!(result.resource_kind, ResourceKind::Raw);
        assert_eq!(result.size_bytes, 7);
        assert_eq!(harness.stored_files(), 1);
        assert!(!buffer_path.exists());
    }

    #[tokio::test]
    async fn test_video_upload_produces_adaptive_stream() {
        let harness = Harness::new().await;
        let orchestrator =
            harness.orchestrator(harness.store.clone(), FakeEncoder::default(), (1920, 1080));
        let input = harness.buffered("clip01.mp4", "holiday.mp4", "video/mp4");
        let buffer_path = input.local_path().to_path_buf();

        let result = orchestrator.handle_upload(input).await.unwrap();

        assert!(result.is_adaptive_stream);
        assert_eq!(result.remote_id, "sharebox/hls/clip01/master.m3u8");
        assert_eq!(result.format.as_deref(), Some("m3u8"));
        assert_eq!((result.width, result.height), (Some(1920), Some(1080)));
        assert_eq!(result.thumbnail_remote_id.as_deref(), Some("sharebox/hls/clip01/poster.jpg"));

        let entries = result.stream_entries.as_ref().unwrap();
        // index.m3u8 + one segment per tier
        assert_eq!(entries.len(), 8);
        let mut tiers: Vec<&str> = entries.iter().map(|e| e.tier_name.as_str()).collect();
        tiers.dedup();
        assert_eq!(tiers, vec!["1080p", "360p", "480p", "720p"]);

        let master = std::fs::read_to_string(
            harness.store.base_path().join("raw").join(&result.remote_id),
        )
        .unwrap();
        assert_eq!(master.matches("#EXT-X-STREAM-INF").count(), 4);

        assert_eq!(result.remote_objects().len(), 10);
        assert!(harness.workspace_is_empty());
        assert!(!buffer_path.exists());
    }

    #[tokio::test]
    async fn test_small_video_gets_single_tier() {
        let harness = Harness::new().await;
        let orchestrator =
            harness.orchestrator(harness.store.clone(), FakeEncoder::default(), (640, 360));
        let input = harness.buffered("small.webm", "small.webm", "video/webm");

        let result = orchestrator.handle_upload(input).await.unwrap();
        let entries = result.stream_entries.unwrap();
        assert!(entries.iter().all(|e| e.tier_name == "360p"));
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn test_transcode_failure_cleans_up() {
        let harness = Harness::new().await;
        let encoder = FakeEncoder {
            fail_tier: Some("480p".to_string()),
            ..Default::default()
        };
        let orchestrator = harness.orchestrator(harness.store.clone(), encoder, (1920, 1080));
        let input = harness.buffered("broken.mp4", "broken.mp4", "video/mp4");
        let buffer_path = input.local_path().to_path_buf();

        let result = orchestrator.handle_upload(input).await;

        assert!(matches!(
            result,
            Err(ProcessingError::Transcode { ref tier, .. }) if tier == "480p"
        ));
        assert!(harness.workspace_is_empty());
        assert!(!buffer_path.exists());
        assert_eq!(harness.stored_files(), 0);
    }

    #[tokio::test]
    async fn test_partial_rendition_upload_fails_and_cleans_up() {
        let harness = Harness::new().await;
        let flaky = Arc::new(FlakyStore {
            inner: (*harness.store).clone(),
            fail_on: "segment".to_string(),
            uploads: AtomicUsize::new(0),
        });
        let orchestrator = harness.orchestrator(flaky.clone(), FakeEncoder::default(), (640, 360));
        let input = harness.buffered("clip.mp4", "clip.mp4", "video/mp4");

        let result = orchestrator.handle_upload(input).await;

        assert!(matches!(result, Err(ProcessingError::Upload(_))));
        assert!(flaky.uploads.load(Ordering::SeqCst) >= 3);
        assert!(harness.workspace_is_empty());
        assert_eq!(harness.stored_files(), 0);
    }

    #[tokio::test]
    async fn test_poster_failure_is_not_fatal() {
        let harness = Harness::new().await;
        let encoder = FakeEncoder {
            fail_poster: true,
            ..Default::default()
        };
        let orchestrator = harness.orchestrator(harness.store.clone(), encoder, (640, 360));
        let input = harness.buffered("clip.mov", "clip.mov", "video/quicktime");

        let result = orchestrator.handle_upload(input).await.unwrap();
        assert!(result.is_adaptive_stream);
        assert!(result.thumbnail_url.is_none());
    }

    #[tokio::test]
    async fn test_oversized_input_rejected() {
        let harness = Harness::new().await;
        let orchestrator = harness.orchestrator(harness.store.clone(), FakeEncoder::default(), (0, 0));
        let mut input = harness.buffered("big.bin", "big.pdf", "application/pdf");
        input.size_bytes = 200 * MIB;
        let buffer_path = input.local_path().to_path_buf();

        match orchestrator.handle_upload(input).await {
            Err(ProcessingError::Validation(msg)) => {
                assert_eq!(msg, "File size too large. Maximum allowed size is 100 MB")
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(!buffer_path.exists());
        assert_eq!(harness.stored_files(), 0);
    }

    #[tokio::test]
    async fn test_local_path_input_is_left_in_place() {
        let harness = Harness::new().await;
        let orchestrator = harness.orchestrator(harness.store.clone(), FakeEncoder::default(), (0, 0));
        let path = harness.root.path().join("keep.txt");
        std::fs::write(&path, b"notes").unwrap();

        orchestrator
            .handle_upload(UploadInput::local(&path, "text/plain", 5))
            .await
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_tier_name_of() {
        assert_eq!(
            tier_name_of("sharebox/hls/a", "sharebox/hls/a/720p/segment_000.ts"),
            "720p"
        );
        assert_eq!(sanitize_segment("my clip (1)"), "my_clip__1_");
    }
}
