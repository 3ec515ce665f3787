//! Owner-scoped file records: upload, list, replace, delete.

use super::parse_file_id;
use crate::auth::Principal;
use crate::error::{ErrorEnvelope, HttpAppError};
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::utils::upload::buffer_multipart_file;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Response,
};
use serde::Serialize;
use sharebox_core::FileRecord;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileUploadData {
    pub file_data: FileRecord,
    pub sharable_link: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileUpdateData {
    pub file: FileRecord,
    pub sharable_link: String,
}

/// Multipart body with a single `file` part
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

#[utoipa::path(
    post,
    path = "/api/files/upload",
    tag = "files",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "File uploaded and saved", body = FileUploadData),
        (status = 400, description = "Invalid or oversized file", body = ErrorEnvelope),
        (status = 401, description = "Not authenticated", body = ErrorEnvelope),
        (status = 415, description = "Unsupported file type", body = ErrorEnvelope),
        (status = 500, description = "Processing or storage failure", body = ErrorEnvelope)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, multipart), fields(user_id = %principal.user_id, operation = "upload_file"))]
pub async fn upload_file(
    principal: Principal,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, HttpAppError> {
    let buffered =
        buffer_multipart_file(multipart, &state.upload_temp_dir, state.validator()).await?;
    let record = state
        .files
        .create(&principal.user_id, buffered.into_input())
        .await?;

    let sharable_link = record.url.clone();
    Ok(ApiResponse::new(
        Some(FileUploadData {
            file_data: record,
            sharable_link,
        }),
        "File uploaded and saved successfully",
    )
    .with_status(StatusCode::CREATED))
}

#[utoipa::path(
    get,
    path = "/api/files/all",
    tag = "files",
    responses(
        (status = 200, description = "Caller's files, newest first", body = [FileRecord]),
        (status = 401, description = "Not authenticated", body = ErrorEnvelope)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state), fields(user_id = %principal.user_id, operation = "list_files"))]
pub async fn list_files(
    principal: Principal,
    State(state): State<Arc<AppState>>,
) -> Result<ApiResponse<Vec<FileRecord>>, HttpAppError> {
    let files = state.files.list(&principal.user_id).await?;
    Ok(ApiResponse::new(Some(files), "Files fetched successfully"))
}

#[utoipa::path(
    put,
    path = "/api/files/update/{fileId}",
    tag = "files",
    params(("fileId" = String, Path, description = "File record id")),
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File content replaced", body = FileUpdateData),
        (status = 400, description = "Invalid or oversized file", body = ErrorEnvelope),
        (status = 404, description = "File not found", body = ErrorEnvelope),
        (status = 409, description = "File replaced concurrently", body = ErrorEnvelope),
        (status = 500, description = "Processing or storage failure", body = ErrorEnvelope)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, multipart), fields(user_id = %principal.user_id, operation = "update_file"))]
pub async fn update_file(
    principal: Principal,
    Path(file_id): Path<String>,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<ApiResponse<FileUpdateData>, HttpAppError> {
    let file_id = parse_file_id(&file_id)?;
    let buffered =
        buffer_multipart_file(multipart, &state.upload_temp_dir, state.validator()).await?;
    let file = state
        .files
        .replace(&principal.user_id, file_id, buffered.into_input())
        .await?;

    let sharable_link = file.url.clone();
    Ok(ApiResponse::new(
        Some(FileUpdateData {
            file,
            sharable_link,
        }),
        "File updated successfully",
    ))
}

#[utoipa::path(
    delete,
    path = "/api/files/delete/{fileId}",
    tag = "files",
    params(("fileId" = String, Path, description = "File record id")),
    responses(
        (status = 200, description = "File deleted"),
        (status = 404, description = "File not found", body = ErrorEnvelope),
        (status = 500, description = "Remote deletion failed", body = ErrorEnvelope)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state), fields(user_id = %principal.user_id, operation = "delete_file"))]
pub async fn delete_file(
    principal: Principal,
    Path(file_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<ApiResponse<()>, HttpAppError> {
    let file_id = parse_file_id(&file_id)?;
    state.files.delete(&principal.user_id, file_id).await?;
    Ok(ApiResponse::message_only("File deleted successfully"))
}
