//! OpenAPI documentation served at `/api/openapi.json`.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use sharebox_core::models;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
        );
        components.add_security_scheme(
            "cookie_auth",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(
                crate::constants::ACCESS_TOKEN_COOKIE,
            ))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Sharebox API",
        version = "0.1.0",
        description = "File sharing API. Uploads are validated and stored on a remote object store; videos are transcoded into an HLS ladder before upload."
    ),
    paths(
        handlers::health::health_check,
        handlers::files::upload_file,
        handlers::files::list_files,
        handlers::files::update_file,
        handlers::files::delete_file,
        handlers::upload::upload_only,
        handlers::upload::delete_remote,
    ),
    components(
        schemas(
            models::FileRecord,
            models::FileStatus,
            models::ResourceKind,
            models::RemoteObject,
            models::StreamEntry,
            models::UploadResult,
            handlers::files::FileUploadData,
            handlers::files::FileUpdateData,
            handlers::files::UploadForm,
            handlers::upload::DeleteRemoteRequest,
            handlers::upload::DeletedObject,
            error::ErrorEnvelope,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Liveness"),
        (name = "files", description = "Owner-scoped file records"),
        (name = "upload", description = "Pipeline-only upload and remote deletion"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_every_route() {
        let spec = get_openapi_spec();
        for path in [
            "/api/health",
            "/api/files/upload",
            "/api/files/all",
            "/api/files/update/{fileId}",
            "/api/files/delete/{fileId}",
            "/api/upload/upload",
            "/api/upload/delete",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
