//! Choosing which rungs of the quality ladder to encode.

use sharebox_core::QualityTier;

/// A tier resolved against a concrete source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTier {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub bitrate_kbps: u32,
}

impl PlannedTier {
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Round down to an even value, never below 2. H.264 4:2:0 needs even dimensions.
fn even_floor(value: u64) -> u32 {
    let even = value - value % 2;
    even.max(2).min(u32::MAX as u64) as u32
}

/// Height keeping the source aspect ratio at `width`.
fn scaled_height(width: u32, source_width: u32, source_height: u32) -> u32 {
    even_floor(width as u64 * source_height as u64 / source_width as u64)
}

/// Tiers to encode for a `source_width`x`source_height` input, widest first.
///
/// Every ladder tier no wider than `min(source_width, max_width)` is kept.
/// When none fits, the narrowest tier is still produced at the source width
/// so the set is never empty and nothing is upscaled.
pub fn plan_tiers(
    ladder: &[QualityTier],
    source_width: u32,
    source_height: u32,
    max_width: u32,
) -> Vec<PlannedTier> {
    if source_width == 0 || source_height == 0 || ladder.is_empty() {
        return Vec::new();
    }

    let width_cap = source_width.min(max_width.max(2));

    let mut planned: Vec<PlannedTier> = ladder
        .iter()
        .filter(|tier| tier.target_width <= width_cap)
        .map(|tier| PlannedTier {
            name: tier.name.clone(),
            width: tier.target_width,
            height: scaled_height(tier.target_width, source_width, source_height),
            bitrate_kbps: tier.bitrate_kbps,
        })
        .collect();

    if planned.is_empty() {
        if let Some(smallest) = ladder.iter().min_by_key(|tier| tier.target_width) {
            let width = even_floor(width_cap as u64);
            planned.push(PlannedTier {
                name: smallest.name.clone(),
                width,
                height: scaled_height(width, source_width, source_height),
                bitrate_kbps: smallest.bitrate_kbps,
            });
        }
    }

    planned.sort_by(|a, b| b.width.cmp(&a.width));
    planned
}
