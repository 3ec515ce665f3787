use super::attempts::AttemptStore;
use super::models::Principal;
use super::token::decode_access_token;
use crate::constants::ACCESS_TOKEN_COOKIE;
use crate::error::HttpAppError;
use crate::utils::client_ip::client_ip;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sharebox_core::AppError;
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthState {
    pub access_token_secret: String,
    pub attempts: Arc<dyn AttemptStore>,
    pub trusted_proxy_count: usize,
}

fn too_many_attempts() -> Response {
    HttpAppError(AppError::TooManyRequests(
        "Too many failed authentication attempts".to_string(),
    ))
    .into_response()
}

/// Token from `Authorization: Bearer`, falling back to the access token cookie.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == ACCESS_TOKEN_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let socket_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_ip(
        request.headers(),
        socket_addr.as_ref(),
        auth_state.trusted_proxy_count,
    );

    if auth_state.attempts.is_blocked(&client).await {
        tracing::warn!(client_ip = %client, "Rejected request from blocked client");
        return too_many_attempts();
    }

    let claims = match extract_token(request.headers()) {
        Some(token) => decode_access_token(&auth_state.access_token_secret, &token),
        None => Err(AppError::Unauthorized(
            "Please login to access this resource".to_string(),
        )),
    };

    match claims {
        Ok(claims) => {
            auth_state.attempts.reset(&client).await;
            tracing::debug!(user_id = %claims.user_id, "Request authenticated");
            request.extensions_mut().insert(Principal {
                user_id: claims.user_id,
            });
            next.run(request).await
        }
        Err(err) => {
            if auth_state.attempts.record_failure(&client).await {
                tracing::warn!(client_ip = %client, "Client blocked after repeated auth failures");
                return too_many_attempts();
            }
            HttpAppError(err).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_preferred_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(header::COOKIE, HeaderValue::from_static("accessToken=def"));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn test_cookie_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; accessToken=def; other=1"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("def"));
    }

    #[test]
    fn test_missing_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert!(extract_token(&headers).is_none());
    }
}
