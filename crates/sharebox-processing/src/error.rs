use sharebox_core::AppError;
use sharebox_storage::StorageError;

/// Failures of the upload pipeline, by stage.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("{0}")]
    Validation(String),

    #[error("Media probe failed: {0}")]
    MediaProbe(String),

    #[error("Transcode failed for tier {tier}: {message}")]
    Transcode { tier: String, message: String },

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

impl From<StorageError> for ProcessingError {
    fn from(err: StorageError) -> Self {
        ProcessingError::Upload(err.to_string())
    }
}

impl From<std::io::Error> for ProcessingError {
    fn from(err: std::io::Error) -> Self {
        ProcessingError::Pipeline(format!("IO error: {}", err))
    }
}

impl From<ProcessingError> for AppError {
    fn from(err: ProcessingError) -> Self {
        match err {
            ProcessingError::Validation(msg) => AppError::Validation(msg),
            ProcessingError::MediaProbe(msg) => AppError::MediaProbe(msg),
            ProcessingError::Transcode { tier, message } => AppError::Transcode { tier, message },
            ProcessingError::Upload(msg) => AppError::Upload(msg),
            ProcessingError::Pipeline(msg) => AppError::Pipeline(msg),
        }
    }
}
