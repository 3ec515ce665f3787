use sharebox_core::UploadInput;

use crate::error::ProcessingError;

/// MIME types accepted besides the `video/*` and `image/*` families.
const DOCUMENT_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "text/plain",
];

/// Whether an upload with this MIME type is accepted at all.
pub fn is_allowed_mime_type(mime_type: &str) -> bool {
    let normalized = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    normalized.starts_with("video/")
        || normalized.starts_with("image/")
        || DOCUMENT_MIME_TYPES.contains(&normalized.as_str())
}

/// Entry checks of the upload pipeline
pub struct UploadValidator {
    max_size_bytes: u64,
}

impl UploadValidator {
    pub fn new(max_size_bytes: u64) -> Self {
        Self { max_size_bytes }
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    pub fn too_large_message(&self) -> String {
        format!(
            "File size too large. Maximum allowed size is {} MB",
            self.max_size_bytes / (1024 * 1024)
        )
    }

    /// Validate declared size
    pub fn validate_size(&self, size_bytes: u64) -> Result<(), ProcessingError> {
        if size_bytes == 0 {
            return Err(ProcessingError::Validation("Uploaded file is empty".to_string()));
        }

        if size_bytes > self.max_size_bytes {
            return Err(ProcessingError::Validation(self.too_large_message()));
        }

        Ok(())
    }

    /// Validate an input before any processing happens.
    pub async fn validate(&self, input: &UploadInput) -> Result<(), ProcessingError> {
        self.validate_size(input.size_bytes)?;

        let path = input.local_path();
        let metadata = tokio::fs::metadata(path).await.map_err(|_| {
            ProcessingError::Validation(format!(
                "Uploaded file is missing or unreadable: {}",
                input.original_name()
            ))
        })?;

        if !metadata.is_file() {
            return Err(ProcessingError::Validation(format!(
                "Uploaded file is not a regular file: {}",
                input.original_name()
            )));
        }

        // The declared size comes from the caller; the file on disk is authoritative.
        if metadata.len() == 0 {
            return Err(ProcessingError::Validation("Uploaded file is empty".to_string()));
        }
        self.validate_size(metadata.len())?;

        tokio::fs::File::open(path).await.map_err(|_| {
            ProcessingError::Validation(format!(
                "Uploaded file is missing or unreadable: {}",
                input.original_name()
            ))
        })?;

        Ok(())
    }
}
