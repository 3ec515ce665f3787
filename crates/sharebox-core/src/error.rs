//! Error types module
//!
//! All errors that reach the HTTP boundary are unified under [`AppError`].
//! Each variant self-describes its response through [`ErrorMetadata`].
//! `From<sqlx::Error>` is gated behind the `sqlx` feature.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "UPLOAD_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Media probe error: {0}")]
    MediaProbe(String),

    #[error("Transcode error in tier {tier}: {message}")]
    Transcode { tier: String, message: String },

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Remote delete error: {0}")]
    RemoteDelete(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Too many requests: {0}")]
    TooManyRequests(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".to_string()),
            other => AppError::Database(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Validation(_) => (
            400,
            "VALIDATION_ERROR",
            false,
            Some("Check the file and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::MediaProbe(_) => (
            400,
            "MEDIA_PROBE_ERROR",
            false,
            Some("Check the video file is not corrupted"),
            false,
            LogLevel::Warn,
        ),
        AppError::Transcode { .. } => (
            500,
            "TRANSCODE_ERROR",
            false,
            Some("Contact support if this error persists"),
            true,
            LogLevel::Error,
        ),
        AppError::Upload(_) => (
            500,
            "UPLOAD_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Pipeline(_) => (
            500,
            "PIPELINE_ERROR",
            false,
            Some("Contact support if this error persists"),
            true,
            LogLevel::Error,
        ),
        AppError::RemoteDelete(_) => (
            500,
            "DELETE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::BadRequest(_) => (
            400,
            "BAD_REQUEST",
            false,
            Some("Check request format and parameters"),
            false,
            LogLevel::Debug,
        ),
        AppError::Unauthorized(_) => (
            401,
            "UNAUTHORIZED",
            false,
            Some("Log in again to obtain a fresh access token"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::Conflict(_) => (
            409,
            "CONFLICT",
            true,
            Some("Reload the resource and retry"),
            false,
            LogLevel::Warn,
        ),
        AppError::UnsupportedMediaType(_) => (
            415,
            "UNSUPPORTED_MEDIA_TYPE",
            false,
            Some("Upload a video, image, PDF, Office document or text file"),
            false,
            LogLevel::Debug,
        ),
        AppError::TooManyRequests(_) => (
            429,
            "TOO_MANY_REQUESTS",
            true,
            Some("Wait a few minutes and retry"),
            false,
            LogLevel::Warn,
        ),
        AppError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Validation(_) => "Validation",
            AppError::MediaProbe(_) => "MediaProbe",
            AppError::Transcode { .. } => "Transcode",
            AppError::Upload(_) => "Upload",
            AppError::Pipeline(_) => "Pipeline",
            AppError::RemoteDelete(_) => "RemoteDelete",
            AppError::BadRequest(_) => "BadRequest",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::NotFound(_) => "NotFound",
            AppError::Conflict(_) => "Conflict",
            AppError::UnsupportedMediaType(_) => "UnsupportedMediaType",
            AppError::TooManyRequests(_) => "TooManyRequests",
            AppError::Database(_) => "Database",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Validation(ref msg) => msg.clone(),
            AppError::MediaProbe(ref msg) => msg.clone(),
            AppError::Transcode { tier, .. } => {
                format!("Failed to transcode the {} rendition", tier)
            }
            AppError::Upload(_) => "Failed to upload file to storage".to_string(),
            AppError::Pipeline(_) => "Failed to process the upload".to_string(),
            AppError::RemoteDelete(_) => "Failed to delete file".to_string(),
            AppError::BadRequest(ref msg) => msg.clone(),
            AppError::Unauthorized(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::Conflict(ref msg) => msg.clone(),
            AppError::UnsupportedMediaType(ref msg) => msg.clone(),
            AppError::TooManyRequests(ref msg) => msg.clone(),
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_validation() {
        let err = AppError::Validation(
            "File size too large. Maximum allowed size is 100 MB".to_string(),
        );
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(!err.is_recoverable());
        assert_eq!(
            err.client_message(),
            "File size too large. Maximum allowed size is 100 MB"
        );
        assert!(!err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_transcode_names_tier() {
        let err = AppError::Transcode {
            tier: "720p".to_string(),
            message: "ffmpeg exited with status 1".to_string(),
        };
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "TRANSCODE_ERROR");
        assert!(err.client_message().contains("720p"));
        assert!(!err.client_message().contains("ffmpeg"));
        assert!(err.is_sensitive());
    }

    #[test]
    fn test_error_metadata_upload_is_recoverable() {
        let err = AppError::Upload("connection reset".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert!(err.is_recoverable());
        assert_eq!(err.client_message(), "Failed to upload file to storage");
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_remote_delete_hides_backend_message() {
        let err = AppError::RemoteDelete("HTTP 502 from media host".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "DELETE_ERROR");
        assert_eq!(err.client_message(), "Failed to delete file");
    }

    #[test]
    fn test_boundary_status_codes() {
        assert_eq!(AppError::Unauthorized("x".into()).http_status_code(), 401);
        assert_eq!(AppError::NotFound("x".into()).http_status_code(), 404);
        assert_eq!(AppError::Conflict("x".into()).http_status_code(), 409);
        assert_eq!(
            AppError::UnsupportedMediaType("x".into()).http_status_code(),
            415
        );
        assert_eq!(AppError::TooManyRequests("x".into()).http_status_code(), 429);
        assert_eq!(AppError::MediaProbe("x".into()).http_status_code(), 400);
    }

    #[test]
    fn test_detailed_message_includes_source_chain() {
        let err = AppError::from(anyhow::anyhow!("root cause").context("outer"));
        assert_eq!(err.error_type(), "Internal");
        assert!(err.detailed_message().contains("Caused by: outer"));
    }
}
