pub mod files;
pub mod health;
pub mod upload;

use crate::error::HttpAppError;
use axum::http::Uri;
use sharebox_core::AppError;
use uuid::Uuid;

/// Envelope for requests that match no route.
pub async fn route_not_found(uri: Uri) -> HttpAppError {
    HttpAppError(AppError::NotFound(format!("Route {} not found", uri.path())))
}

/// Record ids arrive as path text; a malformed id cannot name any record.
pub(crate) fn parse_file_id(raw: &str) -> Result<Uuid, HttpAppError> {
    Uuid::parse_str(raw)
        .map_err(|_| HttpAppError(AppError::NotFound("File not found".to_string())))
}
