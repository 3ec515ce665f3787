use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use utoipa::ToSchema;

use super::media::ResourceKind;

/// Where the bytes of an upload live on local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadSource {
    /// A file the caller keeps ownership of.
    LocalPath(PathBuf),
    /// A buffer written by the HTTP boundary; the pipeline deletes it when done.
    BufferedUpload {
        path: PathBuf,
        original_name: String,
    },
}

impl UploadSource {
    pub fn path(&self) -> &Path {
        match self {
            UploadSource::LocalPath(path) => path,
            UploadSource::BufferedUpload { path, .. } => path,
        }
    }

    /// Whether the pipeline owns (and must delete) the file.
    pub fn is_owned(&self) -> bool {
        matches!(self, UploadSource::BufferedUpload { .. })
    }
}

/// Inbound file handed to the upload pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadInput {
    pub source: UploadSource,
    pub mime_type: String,
    pub size_bytes: u64,
}

impl UploadInput {
    pub fn buffered(
        path: impl Into<PathBuf>,
        original_name: impl Into<String>,
        mime_type: impl Into<String>,
        size_bytes: u64,
    ) -> Self {
        Self {
            source: UploadSource::BufferedUpload {
                path: path.into(),
                original_name: original_name.into(),
            },
            mime_type: mime_type.into(),
            size_bytes,
        }
    }

    pub fn local(path: impl Into<PathBuf>, mime_type: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            source: UploadSource::LocalPath(path.into()),
            mime_type: mime_type.into(),
            size_bytes,
        }
    }

    pub fn local_path(&self) -> &Path {
        self.source.path()
    }

    /// Name the user gave the file, falling back to the on-disk name.
    pub fn original_name(&self) -> String {
        match &self.source {
            UploadSource::BufferedUpload { original_name, .. } => original_name.clone(),
            UploadSource::LocalPath(path) => path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("file")
                .to_string(),
        }
    }

    /// Lowercased extension of the on-disk file, if any.
    pub fn extension(&self) -> Option<String> {
        self.local_path()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }
}

/// One non-master object of an adaptive stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StreamEntry {
    pub tier_name: String,
    pub url: String,
    pub remote_id: String,
}

/// Normalized outcome of one upload call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub url: String,
    pub remote_id: String,
    pub resource_kind: ResourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    pub size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_remote_id: Option<String>,
    pub is_adaptive_stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_entries: Option<Vec<StreamEntry>>,
}

impl UploadResult {
    /// Every remote object this result references, master first.
    ///
    /// Rendition artifacts are stored as raw objects and the poster frame as an image.
    pub fn remote_objects(&self) -> Vec<(String, ResourceKind)> {
        let master_kind = if self.is_adaptive_stream {
            ResourceKind::Raw
        } else {
            self.resource_kind
        };
        let mut objects = vec![(self.remote_id.clone(), master_kind)];

        if let Some(entries) = &self.stream_entries {
            objects.extend(
                entries
                    .iter()
                    .map(|entry| (entry.remote_id.clone(), ResourceKind::Raw)),
            );
        }

        if let Some(thumbnail_id) = &self.thumbnail_remote_id {
            objects.push((thumbnail_id.clone(), ResourceKind::Image));
        }

        objects
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adaptive_result() -> UploadResult {
        UploadResult {
            url: "https://cdn.example/raw/v/master.m3u8".to_string(),
            remote_id: "v/master.m3u8".to_string(),
            resource_kind: ResourceKind::Video,
            format: Some("m3u8".to_string()),
            size_bytes: 300,
            width: Some(1280),
            height: Some(720),
            duration_seconds: Some(12.5),
            thumbnail_url: Some("https://cdn.example/image/v/poster".to_string()),
            thumbnail_remote_id: Some("v/poster".to_string()),
            is_adaptive_stream: true,
            stream_entries: Some(vec![
                StreamEntry {
                    tier_name: "720p".to_string(),
                    url: "https://cdn.example/raw/v/720p/index.m3u8".to_string(),
                    remote_id: "v/720p/index.m3u8".to_string(),
                },
                StreamEntry {
                    tier_name: "720p".to_string(),
                    url: "https://cdn.example/raw/v/720p/segment_000.ts".to_string(),
                    remote_id: "v/720p/segment_000.ts".to_string(),
                },
            ]),
        }
    }

    #[test]
    fn test_remote_objects_cover_master_tiers_and_poster() {
        let objects = adaptive_result().remote_objects();
        assert_eq!(objects.len(), 4);
        assert_eq!(objects[0], ("v/master.m3u8".to_string(), ResourceKind::Raw));
        assert_eq!(objects[3], ("v/poster".to_string(), ResourceKind::Image));
    }

    #[test]
    fn test_remote_objects_for_plain_file() {
        let result = UploadResult {
            stream_entries: None,
            thumbnail_url: None,
            thumbnail_remote_id: None,
            is_adaptive_stream: false,
            resource_kind: ResourceKind::Image,
            ..adaptive_result()
        };
        assert_eq!(
            result.remote_objects(),
            vec![("v/master.m3u8".to_string(), ResourceKind::Image)]
        );
    }

    #[test]
    fn test_original_name_falls_back_to_path() {
        let input = UploadInput::local("/tmp/report.pdf", "application/pdf", 10);
        assert_eq!(input.original_name(), "report.pdf");
        assert_eq!(input.extension().as_deref(), Some("pdf"));
        assert!(!input.source.is_owned());

        let buffered = UploadInput::buffered("/tmp/abc.MP4", "holiday.mp4", "video/mp4", 10);
        assert_eq!(buffered.original_name(), "holiday.mp4");
        assert_eq!(buffered.extension().as_deref(), Some("mp4"));
        assert!(buffered.source.is_owned());
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let json = serde_json::to_value(adaptive_result()).unwrap();
        assert_eq!(json["isAdaptiveStream"], true);
        assert_eq!(json["resourceKind"], "video");
        assert_eq!(json["streamEntries"][0]["tierName"], "720p");
    }
}
