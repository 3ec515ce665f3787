//! Client for a Cloudinary-style media host.
//!
//! Uploads and destroys are signed REST calls: the request parameters are
//! sorted, joined as `key=value&...`, suffixed with the API secret and hashed
//! with SHA-256.

use crate::keys;
use crate::traits::{DestroyOutcome, RemoteStore, StorageError, StorageResult, UploadOptions};
use crate::StoreBackend;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use sharebox_core::{RemoteObject, ResourceKind};
use std::path::Path;
use std::time::Duration;
use tokio_util::io::ReaderStream;

const REQUEST_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: String,
    bytes: u64,
    resource_type: String,
    format: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Remote store backed by the media host's upload API
#[derive(Clone)]
pub struct MediaHostStore {
    client: Client,
    api_base: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

impl MediaHostStore {
    pub fn new(
        cloud_name: String,
        api_key: String,
        api_secret: String,
        api_base: String,
    ) -> StorageResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            cloud_name,
            api_key,
            api_secret,
        })
    }

    fn endpoint(&self, kind: Option<ResourceKind>, action: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.api_base,
            self.cloud_name,
            kind.map(|k| k.as_str()).unwrap_or("auto"),
            action
        )
    }

    /// Parameters plus `api_key`, `signature` and `signature_algorithm`.
    fn signed_form(&self, params: Vec<(&'static str, String)>) -> Form {
        let signature = sign_params(&params, &self.api_secret);
        params
            .into_iter()
            .fold(Form::new(), |form, (key, value)| form.text(key, value))
            .text("api_key", self.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256")
    }
}

/// Hex SHA-256 of the sorted, non-empty params followed by the secret.
pub(crate) fn sign_params(params: &[(&str, String)], secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Public id to request for a preserved name.
///
/// The host keeps the extension in raw ids and appends the format itself for
/// images and videos.
fn preserved_public_id(folder: Option<&str>, file_name: &str, kind: Option<ResourceKind>) -> String {
    let name = match kind {
        Some(ResourceKind::Raw) => file_name,
        _ => Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name),
    };
    keys::remote_id(folder, name)
}

fn into_remote_object(response: UploadResponse, requested: Option<ResourceKind>) -> RemoteObject {
    let resource_kind = response
        .resource_type
        .parse()
        .unwrap_or_else(|_| requested.unwrap_or(ResourceKind::Raw));
    let format = response
        .format
        .filter(|f| !f.is_empty())
        .or_else(|| keys::extension(&response.public_id));

    RemoteObject {
        remote_id: response.public_id,
        url: response.secure_url,
        size_bytes: response.bytes,
        resource_kind,
        format,
    }
}

async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    match response.text().await {
        Ok(body) => serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error.message)
            .unwrap_or_else(|_| format!("HTTP {}: {}", status, body)),
        Err(_) => format!("HTTP {}", status),
    }
}

#[async_trait]
impl RemoteStore for MediaHostStore {
    #[tracing::instrument(skip(self, options), fields(path = %local_path.display(), kind = ?options.kind))]
    async fn upload_file(
        &self,
        local_path: &Path,
        options: &UploadOptions,
    ) -> StorageResult<RemoteObject> {
        let file_name = keys::object_name(local_path, true)?;
        let start = std::time::Instant::now();

        let mut params: Vec<(&'static str, String)> =
            vec![("timestamp", chrono::Utc::now().timestamp().to_string())];
        if options.preserve_name {
            params.push((
                "public_id",
                preserved_public_id(options.folder.as_deref(), &file_name, options.kind),
            ));
        } else if let Some(folder) = &options.folder {
            params.push(("folder", folder.clone()));
        }

        let file = tokio::fs::File::open(local_path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to open {}: {}", local_path.display(), e))
        })?;
        let length = file.metadata().await?.len();
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let part = Part::stream_with_length(body, length).file_name(file_name);
        let form = self.signed_form(params).part("file", part);

        let response = self
            .client
            .post(self.endpoint(options.kind, "upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(format!("Media host request failed: {}", e)))?;

        if !response.status().is_success() {
            let message = error_message(response).await;
            tracing::error!(error = %message, "Media host upload rejected");
            return Err(StorageError::UploadFailed(message));
        }

        let parsed: UploadResponse = response.json().await.map_err(|e| {
            StorageError::UploadFailed(format!("Invalid media host response: {}", e))
        })?;
        let object = into_remote_object(parsed, options.kind);

        tracing::info!(
            remote_id = %object.remote_id,
            kind = %object.resource_kind,
            size_bytes = object.size_bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Media host upload successful"
        );

        Ok(object)
    }

    async fn destroy(&self, remote_id: &str, kind: ResourceKind) -> StorageResult<DestroyOutcome> {
        keys::validate_remote_id(remote_id)?;

        let params = vec![
            ("public_id", remote_id.to_string()),
            ("timestamp", chrono::Utc::now().timestamp().to_string()),
        ];

        let response = self
            .client
            .post(self.endpoint(Some(kind), "destroy"))
            .multipart(self.signed_form(params))
            .send()
            .await
            .map_err(|e| StorageError::DeleteFailed(format!("Media host request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST {
            return Err(StorageError::KindMismatch(error_message(response).await));
        }
        if !status.is_success() {
            return Err(StorageError::DeleteFailed(error_message(response).await));
        }

        let parsed: DestroyResponse = response.json().await.map_err(|e| {
            StorageError::DeleteFailed(format!("Invalid media host response: {}", e))
        })?;

        tracing::debug!(remote_id = %remote_id, kind = %kind, result = %parsed.result, "Media host destroy");

        match parsed.result.as_str() {
            "ok" => Ok(DestroyOutcome::Deleted),
            "not found" => Ok(DestroyOutcome::NotFound),
            other => Err(StorageError::DeleteFailed(format!(
                "Unexpected destroy result '{}' for {}",
                other, remote_id
            ))),
        }
    }

    fn backend_type(&self) -> StoreBackend {
        StoreBackend::MediaHost
    }
}
