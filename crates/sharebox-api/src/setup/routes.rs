//! Route configuration and setup.

use crate::auth::{auth_middleware, AuthState, InMemoryAttemptStore};
use crate::constants::{API_PREFIX, LOCAL_MEDIA_ROUTE, MULTIPART_OVERHEAD_BYTES};
use crate::handlers::{self, files, health, upload};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use sharebox_core::{Config, StoreBackend};
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub async fn setup_routes(
    config: &Config,
    state: Arc<AppState>,
) -> Result<Router<()>, anyhow::Error> {
    let auth_state = Arc::new(setup_auth_state(config));

    let protected_routes = protected_routes().route_layer(
        axum::middleware::from_fn_with_state(auth_state, auth_middleware),
    );

    let http_concurrency_limit = std::env::var("HTTP_CONCURRENCY_LIMIT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(10_000)
        .max(1);
    tracing::info!(
        http_concurrency_limit = http_concurrency_limit,
        "HTTP concurrency limit layer enabled"
    );

    let body_limit = (config.max_upload_size_bytes() + MULTIPART_OVERHEAD_BYTES) as usize;

    let mut app = Router::new()
        .nest(API_PREFIX, public_routes().merge(protected_routes))
        .fallback(handlers::route_not_found);

    if config.storage_backend() == StoreBackend::Local {
        if let Some(root) = config.local_storage_path() {
            tracing::info!(root, route = LOCAL_MEDIA_ROUTE, "Serving local store");
            app = app.nest_service(LOCAL_MEDIA_ROUTE, ServeDir::new(root));
        }
    }

    let app = app
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

fn setup_auth_state(config: &Config) -> AuthState {
    let trusted_proxy_count = std::env::var("TRUSTED_PROXY_COUNT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(1);

    AuthState {
        access_token_secret: config.access_token_secret().to_string(),
        attempts: Arc::new(InMemoryAttemptStore::new(
            config.auth_max_failures(),
            config.auth_failure_window_secs(),
        )),
        trusted_proxy_count,
    }
}

fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .route(
            "/openapi.json",
            get(|| async { Json(crate::api_doc::get_openapi_spec()).into_response() }),
        )
}

fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/files/upload", post(files::upload_file))
        .route("/files/all", get(files::list_files))
        .route("/files/update/{file_id}", put(files::update_file))
        .route("/files/delete/{file_id}", delete(files::delete_file))
        .route("/upload/upload", post(upload::upload_only))
        .route("/upload/delete", delete(upload::delete_remote))
}
