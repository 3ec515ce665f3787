use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use super::media::ResourceKind;
use super::upload::{StreamEntry, UploadResult};

/// Records are written only after every remote object exists, so a stored
/// file is always ready.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ready,
}

impl Display for FileStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FileStatus::Ready => write!(f, "ready"),
        }
    }
}

impl FromStr for FileStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ready" => Ok(FileStatus::Ready),
            _ => Err(anyhow::anyhow!("Invalid file status: {}", s)),
        }
    }
}

/// Persisted metadata for one uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: Uuid,
    pub owner_id: String,
    pub name: String,
    pub mime_type: Option<String>,
    pub status: FileStatus,
    pub url: String,
    pub remote_id: String,
    pub resource_kind: ResourceKind,
    pub format: Option<String>,
    pub size_bytes: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_seconds: Option<f64>,
    pub thumbnail_url: Option<String>,
    pub thumbnail_remote_id: Option<String>,
    pub is_adaptive_stream: bool,
    pub stream_entries: Vec<StreamEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileRecord {
    /// Build a fresh record for `result`, naming it `<uuid>-<original name>`.
    pub fn from_upload(
        owner_id: impl Into<String>,
        original_name: &str,
        mime_type: Option<String>,
        result: UploadResult,
    ) -> Self {
        let now = Utc::now();
        let mut record = Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            name: String::new(),
            mime_type: None,
            status: FileStatus::Ready,
            url: String::new(),
            remote_id: String::new(),
            resource_kind: ResourceKind::Raw,
            format: None,
            size_bytes: 0,
            width: None,
            height: None,
            duration_seconds: None,
            thumbnail_url: None,
            thumbnail_remote_id: None,
            is_adaptive_stream: false,
            stream_entries: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        record.apply_upload(original_name, mime_type, result);
        record
    }

    /// Replace the content fields with those of a new upload.
    pub fn apply_upload(
        &mut self,
        original_name: &str,
        mime_type: Option<String>,
        result: UploadResult,
    ) {
        self.name = unique_name(original_name);
        self.mime_type = mime_type;
        self.status = FileStatus::Ready;
        self.url = result.url;
        self.remote_id = result.remote_id;
        self.resource_kind = result.resource_kind;
        self.format = result.format;
        self.size_bytes = result.size_bytes;
        self.width = result.width;
        self.height = result.height;
        self.duration_seconds = result.duration_seconds;
        self.thumbnail_url = result.thumbnail_url;
        self.thumbnail_remote_id = result.thumbnail_remote_id;
        self.is_adaptive_stream = result.is_adaptive_stream;
        self.stream_entries = result.stream_entries.unwrap_or_default();
        self.updated_at = Utc::now();
    }

    /// The upload fields of this record, as the pipeline produced them.
    pub fn upload_result(&self) -> UploadResult {
        UploadResult {
            url: self.url.clone(),
            remote_id: self.remote_id.clone(),
            resource_kind: self.resource_kind,
            format: self.format.clone(),
            size_bytes: self.size_bytes,
            width: self.width,
            height: self.height,
            duration_seconds: self.duration_seconds,
            thumbnail_url: self.thumbnail_url.clone(),
            thumbnail_remote_id: self.thumbnail_remote_id.clone(),
            is_adaptive_stream: self.is_adaptive_stream,
            stream_entries: if self.stream_entries.is_empty() {
                None
            } else {
                Some(self.stream_entries.clone())
            },
        }
    }
}

fn unique_name(original_name: &str) -> String {
    format!("{}-{}", Uuid::new_v4(), original_name)
}
