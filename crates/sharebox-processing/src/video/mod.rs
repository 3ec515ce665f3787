//! Video inspection and HLS rendition generation.

pub mod inspector;
pub mod manifest;
pub mod tiers;
pub mod transcoder;

pub use inspector::{is_video_path, parse_frame_rate, FfprobeInspector, MediaInspect};
pub use manifest::master_playlist;
pub use tiers::{plan_tiers, PlannedTier};
pub use transcoder::{
    FfmpegEncoder, RenditionSet, RenditionTranscoder, TierEncoder, TierJob, TierRendition,
    TranscodeOptions,
};

/// Reject tool paths and arguments carrying shell metacharacters.
pub(crate) fn validate_path(path: &str) -> anyhow::Result<()> {
    let dangerous_chars = [';', '|', '&', '$', '`', '<', '>', '\n', '\r'];
    if path.chars().any(|c| dangerous_chars.contains(&c)) {
        return Err(anyhow::anyhow!("Path contains dangerous characters: {}", path));
    }
    Ok(())
}
