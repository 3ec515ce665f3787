//! Shared constants.

/// Default maximum accepted upload size in megabytes.
pub const DEFAULT_MAX_UPLOAD_SIZE_MB: u64 = 100;

/// Extensions classified as video by the media inspector.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "wmv", "flv", "mkv", "webm"];

/// Extensions the media host stores as images.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "avif", "bmp", "svg", "ico", "tif", "tiff",
];

/// File name of the master playlist inside a rendition set.
pub const MASTER_MANIFEST_NAME: &str = "master.m3u8";

/// File name of every per-tier playlist.
pub const TIER_MANIFEST_NAME: &str = "index.m3u8";

/// Upper bound applied to probed frame rates.
pub const MAX_FRAME_RATE: f64 = 30.0;
