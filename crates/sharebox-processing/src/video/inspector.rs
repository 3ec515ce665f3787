//! Media inspection via ffprobe.

use async_trait::async_trait;
use sharebox_core::constants::{MAX_FRAME_RATE, VIDEO_EXTENSIONS};
use sharebox_core::MediaProbe;
use std::path::Path;
use tokio::process::Command;

use super::validate_path;
use crate::error::ProcessingError;

/// Classifies a file and, for video, extracts its stream properties.
#[async_trait]
pub trait MediaInspect: Send + Sync {
    async fn probe(&self, local_path: &Path) -> Result<MediaProbe, ProcessingError>;
}

/// Whether the file's extension is on the video allow-list.
pub fn is_video_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| VIDEO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Parse an ffprobe rational such as `30000/1001`. A bare number is accepted too.
pub fn parse_frame_rate(value: &str) -> Option<f64> {
    let value = value.trim();
    let rate = match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => value.parse().ok()?,
    };

    if rate.is_finite() && rate > 0.0 {
        Some(rate)
    } else {
        None
    }
}

/// Build a probe from ffprobe's JSON output for the first video stream.
pub(crate) fn probe_from_json(probe_data: &serde_json::Value) -> Result<MediaProbe, ProcessingError> {
    let stream = probe_data["streams"]
        .get(0)
        .ok_or_else(|| ProcessingError::MediaProbe("No video stream found".to_string()))?;

    let width = stream["width"]
        .as_u64()
        .filter(|w| *w > 0)
        .ok_or_else(|| ProcessingError::MediaProbe("Could not determine video width".to_string()))?
        as u32;
    let height = stream["height"]
        .as_u64()
        .filter(|h| *h > 0)
        .ok_or_else(|| {
            ProcessingError::MediaProbe("Could not determine video height".to_string())
        })? as u32;

    let duration_seconds = probe_data["format"]["duration"]
        .as_str()
        .or_else(|| stream["duration"].as_str())
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0);

    let frame_rate = stream["avg_frame_rate"]
        .as_str()
        .and_then(parse_frame_rate)
        .or_else(|| stream["r_frame_rate"].as_str().and_then(parse_frame_rate))
        .map(|fps| fps.min(MAX_FRAME_RATE));

    Ok(MediaProbe {
        is_video: true,
        width: Some(width),
        height: Some(height),
        duration_seconds,
        frame_rate,
    })
}

/// Inspector backed by the `ffprobe` binary
pub struct FfprobeInspector {
    ffprobe_path: String,
}

impl FfprobeInspector {
    pub fn new(ffprobe_path: String) -> anyhow::Result<Self> {
        validate_path(&ffprobe_path)?;
        Ok(Self { ffprobe_path })
    }
}

#[async_trait]
impl MediaInspect for FfprobeInspector {
    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffprobe",
        process.executable.path = %self.ffprobe_path,
        ffmpeg.operation = "probe"
    ))]
    async fn probe(&self, local_path: &Path) -> Result<MediaProbe, ProcessingError> {
        if !is_video_path(local_path) {
            return Ok(MediaProbe::non_video());
        }

        let start = std::time::Instant::now();

        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
                "-select_streams",
                "v:0",
            ])
            .arg(local_path)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ProcessingError::MediaProbe(format!("Failed to execute ffprobe: {}", e)))?;

        if !output.status.success() {
            return Err(ProcessingError::MediaProbe(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let probe_data: serde_json::Value = serde_json::from_slice(&output.stdout).map_err(|e| {
            ProcessingError::MediaProbe(format!("Failed to parse ffprobe output: {}", e))
        })?;

        let probe = probe_from_json(&probe_data)?;

        tracing::info!(
            duration_ms = start.elapsed().as_millis(),
            width = probe.width,
            height = probe.height,
            video_duration = probe.duration_seconds,
            frame_rate = probe.frame_rate,
            "Video probe completed"
        );

        Ok(probe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_video_extensions() {
        assert!(is_video_path(Path::new("/tmp/clip.MOV")));
        assert!(is_video_path(Path::new("a.webm")));
        assert!(!is_video_path(Path::new("a.pdf")));
        assert!(!is_video_path(Path::new("noext")));
    }

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        let ntsc = parse_frame_rate("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("30/0"), None);
        assert_eq!(parse_frame_rate("1+1"), None);
    }

    #[test]
    fn test_probe_from_json_clamps_frame_rate() {
        let data = json!({
            "streams": [{ "width": 1920, "height": 1080, "avg_frame_rate": "60/1" }],
            "format": { "duration": "12.500000" }
        });
        let probe = probe_from_json(&data).unwrap();
        assert!(probe.is_video);
        assert_eq!(probe.dimensions(), Some((1920, 1080)));
        assert_eq!(probe.duration_seconds, Some(12.5));
        assert_eq!(probe.frame_rate, Some(MAX_FRAME_RATE));
    }

    #[test]
    fn test_probe_from_json_falls_back_to_r_frame_rate() {
        let data = json!({
            "streams": [{ "width": 640, "height": 360, "avg_frame_rate": "0/0", "r_frame_rate": "24/1" }],
            "format": {}
        });
        let probe = probe_from_json(&data).unwrap();
        assert_eq!(probe.frame_rate, Some(24.0));
        assert_eq!(probe.duration_seconds, None);
    }

    #[test]
    fn test_probe_from_json_requires_dimensions() {
        let no_stream = json!({ "streams": [], "format": {} });
        assert!(matches!(
            probe_from_json(&no_stream),
            Err(ProcessingError::MediaProbe(_))
        ));

        let no_height = json!({ "streams": [{ "width": 640 }], "format": {} });
        assert!(matches!(
            probe_from_json(&no_height),
            Err(ProcessingError::MediaProbe(_))
        ));
    }

    #[tokio::test]
    async fn test_non_video_skips_ffprobe() {
        let inspector = FfprobeInspector::new("/nonexistent/ffprobe".to_string()).unwrap();
        let probe = inspector.probe(Path::new("/tmp/report.pdf")).await.unwrap();
        assert!(!probe.is_video);
    }
}
