// 4-channel frame -> single-channel luminance.
// Weights are the usual BT.601 ones (same as a BGR/BGRA-to-gray conversion),
// in 14-bit fixed point: Y = (4899*R + 9617*G + 1868*B + 8192) >> 14.
// Which byte is red and which is blue comes from `Frame::layout`; reading a
// BGRA buffer as RGBA would swap the 0.299 and 0.114 weights and bias the
// shadow threshold.

use crate::types::{Frame, LumaBuffer};
use tracing::debug;

const W_R: u32 = 4899;
const W_G: u32 = 9617;
const W_B: u32 = 1868;
const SHIFT: u32 = 14;

#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((W_R * r as u32 + W_G * g as u32 + W_B * b as u32 + (1 << (SHIFT - 1))) >> SHIFT) as u8
}

/// Owns the luminance plane and reuses it while the resolution holds.
#[derive(Default)]
pub struct FrameConverter {
    luma: LumaBuffer,
}

impl FrameConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert `frame` into the internal plane and return it.
    /// The caller has already rejected invalid frames (`Frame::is_valid`).
    pub fn to_luminance(&mut self, frame: &Frame) -> &LumaBuffer {
        if self.luma.ensure_size(frame.width, frame.height) {
            debug!("luminance buffer reallocated to {}x{}", frame.width, frame.height);
        }
        let (ro, go, bo) = frame.layout.rgb_offsets();
        for (px, out) in frame.data.chunks_exact(4).zip(self.luma.data.iter_mut()) {
            *out = luma(px[ro], px[go], px[bo]);
        }
        &self.luma
    }

    pub fn luminance(&self) -> &LumaBuffer {
        &self.luma
    }
}
