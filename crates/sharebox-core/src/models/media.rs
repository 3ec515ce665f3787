use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;

use crate::constants::{IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};

/// Kind of resource as the remote store files it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Image,
    Video,
    Raw,
}

impl ResourceKind {
    /// Kind the store would pick for a file with this extension.
    pub fn from_extension(extension: &str) -> Self {
        let ext = extension.to_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            ResourceKind::Image
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            ResourceKind::Video
        } else {
            ResourceKind::Raw
        }
    }

    /// Kind tried once when deletion under `self` reports a kind mismatch.
    pub fn alternate(self) -> Self {
        match self {
            ResourceKind::Image => ResourceKind::Raw,
            ResourceKind::Video => ResourceKind::Raw,
            ResourceKind::Raw => ResourceKind::Image,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Image => "image",
            ResourceKind::Video => "video",
            ResourceKind::Raw => "raw",
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" => Ok(ResourceKind::Image),
            "video" => Ok(ResourceKind::Video),
            "raw" => Ok(ResourceKind::Raw),
            _ => Err(anyhow::anyhow!("Invalid resource kind: {}", s)),
        }
    }
}

/// Result of probing an input file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaProbe {
    pub is_video: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_seconds: Option<f64>,
    pub frame_rate: Option<f64>,
}

impl MediaProbe {
    pub fn non_video() -> Self {
        Self::default()
    }

    /// Source dimensions, when both are known.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        }
    }
}

/// One rung of the rendition ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityTier {
    pub name: String,
    pub target_width: u32,
    pub bitrate_kbps: u32,
}

impl QualityTier {
    pub fn new(name: impl Into<String>, target_width: u32, bitrate_kbps: u32) -> Self {
        Self {
            name: name.into(),
            target_width,
            bitrate_kbps,
        }
    }

    /// The built-in ladder, widest first.
    pub fn default_ladder() -> Vec<QualityTier> {
        vec![
            QualityTier::new("1080p", 1920, 5000),
            QualityTier::new("720p", 1280, 2800),
            QualityTier::new("480p", 854, 1400),
            QualityTier::new("360p", 640, 800),
        ]
    }

    /// Parse a ladder from `name:width:kbps` entries separated by commas.
    ///
    /// The returned ladder is sorted widest first.
    pub fn parse_ladder(spec: &str) -> Result<Vec<QualityTier>, anyhow::Error> {
        let mut tiers = Vec::new();
        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
            if parts.len() != 3 || parts[0].is_empty() {
                return Err(anyhow::anyhow!(
                    "Invalid tier '{}': expected name:width:kbps",
                    entry
                ));
            }
            let width: u32 = parts[1]
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid tier width in '{}'", entry))?;
            let bitrate: u32 = parts[2]
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid tier bitrate in '{}'", entry))?;
            if width == 0 || bitrate == 0 {
                return Err(anyhow::anyhow!("Tier '{}' must have non-zero values", entry));
            }
            tiers.push(QualityTier::new(parts[0], width, bitrate));
        }

        if tiers.is_empty() {
            return Err(anyhow::anyhow!("Tier table must contain at least one tier"));
        }

        tiers.sort_by(|a, b| b.target_width.cmp(&a.target_width));
        Ok(tiers)
    }
}

/// One uploaded physical artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    pub remote_id: String,
    pub url: String,
    pub size_bytes: u64,
    pub resource_kind: ResourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl RemoteObject {
    /// Last path segment of the object's id.
    pub fn file_name(&self) -> &str {
        self.remote_id.rsplit('/').next().unwrap_or(&self.remote_id)
    }
}
