//! HLS rendition transcoding.

use async_trait::async_trait;
use futures::future::try_join_all;
use sharebox_core::constants::{MASTER_MANIFEST_NAME, MAX_FRAME_RATE, TIER_MANIFEST_NAME};
use sharebox_core::{MediaProbe, QualityTier};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;

use super::manifest::master_playlist;
use super::tiers::{plan_tiers, PlannedTier};
use super::validate_path;
use crate::error::ProcessingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscodeOptions {
    pub segment_duration: u64,
    pub max_width: u32,
}

impl Default for TranscodeOptions {
    fn default() -> Self {
        Self {
            segment_duration: 10,
            max_width: 1920,
        }
    }
}

/// One tier encode, fully resolved.
#[derive(Debug, Clone)]
pub struct TierJob {
    pub input: PathBuf,
    pub tier_dir: PathBuf,
    pub tier: PlannedTier,
    pub segment_duration: u64,
    /// Frames between forced keyframes, so segments cut cleanly.
    pub keyframe_interval: u32,
}

impl TierJob {
    pub fn playlist_path(&self) -> PathBuf {
        self.tier_dir.join(TIER_MANIFEST_NAME)
    }

    pub fn segment_pattern(&self) -> PathBuf {
        self.tier_dir.join("segment_%03d.ts")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TierRendition {
    pub tier_name: String,
    /// Relative to the rendition root, as referenced by the master playlist.
    pub manifest_relative_path: String,
    pub segments_dir: PathBuf,
    pub width: u32,
    pub height: u32,
    pub bitrate_kbps: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenditionSet {
    pub master_manifest_path: PathBuf,
    pub tiers: Vec<TierRendition>,
}

/// Runs the external encoder.
#[async_trait]
pub trait TierEncoder: Send + Sync {
    /// Write `index.m3u8` plus its segments into `job.tier_dir`.
    async fn encode_tier(&self, job: &TierJob) -> anyhow::Result<()>;

    /// Write a single JPEG frame taken at `at_seconds`.
    async fn extract_poster(
        &self,
        input: &Path,
        output: &Path,
        at_seconds: f64,
    ) -> anyhow::Result<()>;
}

/// Encoder backed by the `ffmpeg` binary
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    ffmpeg_path: String,
}

impl FfmpegEncoder {
    pub fn new(ffmpeg_path: String) -> anyhow::Result<Self> {
        validate_path(&ffmpeg_path)?;
        Ok(Self { ffmpeg_path })
    }

    pub(crate) fn hls_args(job: &TierJob) -> Vec<String> {
        let bitrate_kbps = job.tier.bitrate_kbps;
        let keyframes = job.keyframe_interval.to_string();

        vec![
            "-y".to_string(),
            "-i".to_string(),
            job.input.to_string_lossy().to_string(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "fast".to_string(),
            "-profile:v".to_string(),
            "main".to_string(),
            "-vf".to_string(),
            format!("scale={}:{}", job.tier.width, job.tier.height),
            "-b:v".to_string(),
            format!("{}k", bitrate_kbps),
            "-maxrate".to_string(),
            format!("{}k", bitrate_kbps * 6 / 5),
            "-bufsize".to_string(),
            format!("{}k", bitrate_kbps * 2),
            "-g".to_string(),
            keyframes.clone(),
            "-keyint_min".to_string(),
            keyframes,
            "-sc_threshold".to_string(),
            "0".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            "128k".to_string(),
            "-ac".to_string(),
            "2".to_string(),
            "-ar".to_string(),
            "48000".to_string(),
            "-f".to_string(),
            "hls".to_string(),
            "-hls_time".to_string(),
            job.segment_duration.to_string(),
            "-hls_playlist_type".to_string(),
            "vod".to_string(),
            "-hls_segment_filename".to_string(),
            job.segment_pattern().to_string_lossy().to_string(),
            job.playlist_path().to_string_lossy().to_string(),
        ]
    }

    async fn run(&self, args: &[String]) -> anyhow::Result<()> {
        let output = Command::new(&self.ffmpeg_path)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to execute ffmpeg: {}", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<&str> = stderr.lines().collect();
            let tail = lines[lines.len().saturating_sub(5)..].join("\n");
            return Err(anyhow::anyhow!("FFmpeg failed ({}): {}", output.status, tail));
        }

        Ok(())
    }
}

#[async_trait]
impl TierEncoder for FfmpegEncoder {
    #[tracing::instrument(skip(self, job), fields(
        process.executable.name = "ffmpeg",
        ffmpeg.operation = "hls",
        tier = %job.tier.name,
        resolution = %job.tier.resolution()
    ))]
    async fn encode_tier(&self, job: &TierJob) -> anyhow::Result<()> {
        let start = std::time::Instant::now();
        self.run(&Self::hls_args(job)).await?;
        tracing::info!(
            duration_ms = start.elapsed().as_millis(),
            "Tier encode completed"
        );
        Ok(())
    }

    async fn extract_poster(
        &self,
        input: &Path,
        output: &Path,
        at_seconds: f64,
    ) -> anyhow::Result<()> {
        let args = vec![
            "-ss".to_string(),
            format!("{:.3}", at_seconds.max(0.0)),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-vframes".to_string(),
            "1".to_string(),
            "-q:v".to_string(),
            "2".to_string(),
            "-y".to_string(),
            output.to_string_lossy().to_string(),
        ];
        self.run(&args).await
    }
}

/// Timestamp of the poster frame: a tenth into the video, at most five seconds in.
pub fn poster_timestamp(duration_seconds: Option<f64>) -> f64 {
    duration_seconds
        .map(|d| (d * 0.1).min(5.0))
        .unwrap_or(0.0)
}

/// Produces a full HLS rendition set for a probed video.
pub struct RenditionTranscoder {
    encoder: Arc<dyn TierEncoder>,
    ladder: Vec<QualityTier>,
}

impl RenditionTranscoder {
    pub fn new(encoder: Arc<dyn TierEncoder>, ladder: Vec<QualityTier>) -> Self {
        Self { encoder, ladder }
    }

    pub fn encoder(&self) -> &Arc<dyn TierEncoder> {
        &self.encoder
    }

    /// Encode every eligible tier concurrently, then write `master.m3u8`.
    ///
    /// The first failing tier fails the whole call; encodes still running are
    /// dropped, which kills their subprocesses.
    pub async fn transcode(
        &self,
        local_path: &Path,
        probe: &MediaProbe,
        output_dir: &Path,
        options: &TranscodeOptions,
    ) -> Result<RenditionSet, ProcessingError> {
        let (width, height) = probe.dimensions().ok_or_else(|| {
            ProcessingError::MediaProbe("Video has no width/height".to_string())
        })?;

        let planned = plan_tiers(&self.ladder, width, height, options.max_width);
        if planned.is_empty() {
            return Err(ProcessingError::Pipeline(
                "No quality tiers configured".to_string(),
            ));
        }

        let fps = probe.frame_rate.unwrap_or(MAX_FRAME_RATE);
        let keyframe_interval = ((fps * options.segment_duration as f64).round() as u32).max(1);

        tracing::info!(
            source = %format!("{}x{}", width, height),
            tiers = planned.len(),
            keyframe_interval,
            "Transcoding renditions"
        );

        let mut jobs = Vec::with_capacity(planned.len());
        for tier in planned {
            let tier_dir = output_dir.join(&tier.name);
            tokio::fs::create_dir_all(&tier_dir).await?;
            jobs.push(TierJob {
                input: local_path.to_path_buf(),
                tier_dir,
                tier,
                segment_duration: options.segment_duration,
                keyframe_interval,
            });
        }

        try_join_all(jobs.iter().map(|job| async move {
            self.encoder
                .encode_tier(job)
                .await
                .map_err(|e| ProcessingError::Transcode {
                    tier: job.tier.name.clone(),
                    message: e.to_string(),
                })
        }))
        .await?;

        let tiers: Vec<TierRendition> = jobs
            .into_iter()
            .map(|job| TierRendition {
                manifest_relative_path: format!("{}/{}", job.tier.name, TIER_MANIFEST_NAME),
                tier_name: job.tier.name,
                segments_dir: job.tier_dir,
                // RESOLUTION advertises the encoded size, which is rounded
                // down to even, not the exact aspect-ratio height.
                width: job.tier.width,
                height: job.tier.height,
                bitrate_kbps: job.tier.bitrate_kbps,
            })
            .collect();

        let master_manifest_path = output_dir.join(MASTER_MANIFEST_NAME);
        tokio::fs::write(&master_manifest_path, master_playlist(&tiers)).await?;

        Ok(RenditionSet {
            master_manifest_path,
            tiers,
        })
    }

    /// Extract the poster frame through the configured encoder.
    pub async fn extract_poster(
        &self,
        local_path: &Path,
        output: &Path,
        probe: &MediaProbe,
    ) -> anyhow::Result<()> {
        self.encoder
            .extract_poster(local_path, output, poster_timestamp(probe.duration_seconds))
            .await
    }
}
