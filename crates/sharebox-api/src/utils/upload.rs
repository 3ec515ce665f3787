//! Multipart buffering for upload handlers.

use crate::constants::FILE_FIELD;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use axum::http::StatusCode;
use sharebox_core::{AppError, UploadInput};
use sharebox_processing::{ensure_dir, is_allowed_mime_type, OwnedBuffer, UploadValidator};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

const MAX_FILENAME_LENGTH: usize = 255;

/// One multipart file written to the upload temp dir.
///
/// The file is removed on drop until `into_input` hands it to the pipeline.
#[derive(Debug)]
pub struct BufferedFile {
    pub path: PathBuf,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    buffer: OwnedBuffer,
}

impl BufferedFile {
    /// Hand the buffer to the pipeline, which deletes it when done.
    pub fn into_input(self) -> UploadInput {
        let path = self.buffer.keep().unwrap_or(self.path);
        UploadInput::buffered(path, self.original_name, self.mime_type, self.size_bytes)
    }

    /// Delete the buffer without processing it.
    pub async fn discard(self) {
        self.buffer.discard().await;
    }
}

/// Keep the last path component and replace anything unusual.
pub fn sanitize_filename(filename: &str) -> String {
    let name_only = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);

    let sanitized: String = name_only
        .chars()
        .take(MAX_FILENAME_LENGTH)
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = sanitized.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}

fn multipart_error(err: MultipartError, validator: &UploadValidator) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::Validation(validator.too_large_message())
    } else {
        AppError::BadRequest(format!("Failed to read multipart body: {}", err.body_text()))
    }
}

/// Stream the single `file` field to a fresh buffer under `temp_dir`.
///
/// Rejects disallowed MIME types with 415 before writing anything, and stops
/// writing as soon as the body exceeds the upload limit.
pub async fn buffer_multipart_file(
    mut multipart: Multipart,
    temp_dir: &Path,
    validator: &UploadValidator,
) -> Result<BufferedFile, AppError> {
    let mut buffered: Option<BufferedFile> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                if let Some(previous) = buffered.take() {
                    previous.discard().await;
                }
                return Err(multipart_error(e, validator));
            }
        };

        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        if let Some(previous) = buffered.take() {
            previous.discard().await;
            return Err(AppError::BadRequest(
                "Multiple file fields are not allowed; send exactly one field named 'file'"
                    .to_string(),
            ));
        }

        buffered = Some(write_field(field, temp_dir, validator).await?);
    }

    buffered.ok_or_else(|| AppError::BadRequest("File is required".to_string()))
}

async fn write_field(
    mut field: Field<'_>,
    temp_dir: &Path,
    validator: &UploadValidator,
) -> Result<BufferedFile, AppError> {
    let mime_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    if !is_allowed_mime_type(&mime_type) {
        return Err(AppError::UnsupportedMediaType(format!(
            "Unsupported file type: {}",
            mime_type
        )));
    }

    let original_name = sanitize_filename(field.file_name().unwrap_or("file"));
    let extension = Path::new(&original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default();

    let dir = ensure_dir(temp_dir).await?;
    let path = dir.join(format!("{}{}", Uuid::new_v4(), extension));

    // Removes the buffer on every early return, here or in the caller.
    let buffer = OwnedBuffer::new(&path);
    let mut file = tokio::fs::File::create(&path).await?;
    let mut size_bytes: u64 = 0;

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error(e, validator))?
    {
        size_bytes += chunk.len() as u64;
        if size_bytes > validator.max_size_bytes() {
            return Err(AppError::Validation(validator.too_large_message()));
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    drop(file);

    tracing::debug!(
        path = %path.display(),
        original_name = %original_name,
        size_bytes,
        "Buffered multipart upload"
    );

    Ok(BufferedFile {
        path,
        original_name,
        mime_type,
        size_bytes,
        buffer,
    })
}
