// Shadow extraction: fixed inverse-binary threshold on luminance.
// `level` is tuned at runtime, never derived from the image, so there is no
// compensation for auto-exposure or lighting drift.

use crate::types::{BinaryMask, LumaBuffer};
use tracing::debug;

pub const SHADOW: u8 = 255;
pub const BACKGROUND: u8 = 0;

/// Owns the mask plane and reuses it while the resolution holds.
pub struct ShadowExtractor {
    pub level: u8,
    mask: BinaryMask,
}

impl ShadowExtractor {
    pub fn new(level: u8) -> Self {
        Self { level, mask: BinaryMask::default() }
    }

    /// Pixels with `luminance < level` become 255 (shadow), everything else 0.
    pub fn threshold(&mut self, luminance: &LumaBuffer) -> &BinaryMask {
        if self.mask.ensure_size(luminance.width, luminance.height) {
            debug!("mask buffer reallocated to {}x{}", luminance.width, luminance.height);
        }
        threshold_into(luminance, self.level, &mut self.mask);
        &self.mask
    }

    pub fn mask(&self) -> &BinaryMask {
        &self.mask
    }
}

/// Stateless form; `out` must already have the input's size.
pub fn threshold_into(luminance: &LumaBuffer, level: u8, out: &mut BinaryMask) {
    for (src, dst) in luminance.data.iter().zip(out.data.iter_mut()) {
        *dst = if *src < level { SHADOW } else { BACKGROUND };
    }
}
