//! Master playlist for an HLS rendition set.

use super::transcoder::TierRendition;

/// Extended M3U master playlist with one entry per tier.
pub fn master_playlist(tiers: &[TierRendition]) -> String {
    let mut playlist = String::from("#EXTM3U\n#EXT-X-VERSION:3\n\n");

    for tier in tiers {
        playlist.push_str(&format!(
            "#EXT-X-STREAM-INF:BANDWIDTH={},RESOLUTION={}x{}\n{}\n\n",
            tier.bitrate_kbps as u64 * 1000,
            tier.width,
            tier.height,
            tier.manifest_relative_path
        ));
    }

    playlist
}
