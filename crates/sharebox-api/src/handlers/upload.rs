//! Pipeline-only routes: no metadata record is written.

use crate::auth::Principal;
use crate::error::{ErrorEnvelope, HttpAppError, ValidatedJson};
use crate::handlers::files::UploadForm;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::utils::upload::buffer_multipart_file;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::Response,
};
use serde::{Deserialize, Serialize};
use sharebox_core::{AppError, ResourceKind, UploadResult};
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRemoteRequest {
    pub public_id: Option<String>,
    /// `image`, `video` or `raw`; defaults to `image`
    pub resource_type: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeletedObject {
    pub public_id: String,
}

#[utoipa::path(
    post,
    path = "/api/upload/upload",
    tag = "upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "File processed and stored", body = UploadResult),
        (status = 400, description = "Invalid or oversized file", body = ErrorEnvelope),
        (status = 415, description = "Unsupported file type", body = ErrorEnvelope),
        (status = 500, description = "Processing or storage failure", body = ErrorEnvelope)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, multipart), fields(user_id = %principal.user_id, operation = "upload_only"))]
pub async fn upload_only(
    principal: Principal,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, HttpAppError> {
    let buffered =
        buffer_multipart_file(multipart, &state.upload_temp_dir, state.validator()).await?;
    let result = state.files.process(buffered.into_input()).await?;

    Ok(ApiResponse::new(Some(result), "File uploaded successfully").with_status(StatusCode::CREATED))
}

#[utoipa::path(
    delete,
    path = "/api/upload/delete",
    tag = "upload",
    request_body = DeleteRemoteRequest,
    responses(
        (status = 200, description = "Remote object deleted", body = DeletedObject),
        (status = 400, description = "Missing or invalid public id", body = ErrorEnvelope),
        (status = 500, description = "Deletion failed", body = ErrorEnvelope)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, body), fields(user_id = %principal.user_id, operation = "delete_remote"))]
pub async fn delete_remote(
    principal: Principal,
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<DeleteRemoteRequest>,
) -> Result<ApiResponse<DeletedObject>, HttpAppError> {
    let public_id = body
        .public_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("Public ID is required".to_string()))?;

    let kind_hint = body
        .resource_type
        .as_deref()
        .map(str::parse::<ResourceKind>)
        .transpose()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if !state.files.delete_remote(&public_id, kind_hint).await? {
        return Err(AppError::RemoteDelete(format!("{} could not be deleted", public_id)).into());
    }

    Ok(ApiResponse::new(
        Some(DeletedObject { public_id }),
        "File deleted successfully",
    ))
}
