//! Sharebox Processing Library
//!
//! The upload pipeline: validation, media inspection, HLS rendition
//! transcoding and the orchestrator that ties them to the remote store.

pub mod error;
pub mod upload;
pub mod validator;
pub mod video;
pub mod workspace;

pub use error::ProcessingError;
pub use upload::{OrchestratorSettings, UploadOrchestrator, UploadStage};
pub use validator::{is_allowed_mime_type, UploadValidator};
pub use video::{
    FfmpegEncoder, FfprobeInspector, MediaInspect, RenditionSet, RenditionTranscoder, TierEncoder,
    TierJob, TranscodeOptions,
};
pub use workspace::{ensure_dir, remove_tree, OwnedBuffer, ScopedWorkspace};
