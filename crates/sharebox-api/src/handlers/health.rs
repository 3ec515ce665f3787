use crate::error::ErrorEnvelope;
use crate::response::ApiResponse;
use axum::response::IntoResponse;

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "Server is healthy"),
        (status = 500, description = "Internal server error", body = ErrorEnvelope)
    )
)]
pub async fn health_check() -> impl IntoResponse {
    ApiResponse::message_only("Server is healthy")
}
