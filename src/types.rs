// Core image types shared by the tracking stages and the window.

use serde::{Deserialize, Serialize};

/// Frames with either side at or below this many pixels are treated as invalid.
pub const MIN_FRAME_DIM: u32 = 16;

/// Byte order of a 4-channel, 8-bit-per-channel pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelLayout {
    /// blue, green, red, alpha
    #[default]
    Bgra,
    /// red, green, blue, alpha
    Rgba,
}

impl PixelLayout {
    /// Byte offsets of (red, green, blue) inside one pixel.
    #[inline]
    pub fn rgb_offsets(self) -> (usize, usize, usize) {
        match self {
            PixelLayout::Bgra => (2, 1, 0),
            PixelLayout::Rgba => (0, 1, 2),
        }
    }
}

/// One decoded camera frame. Owned by the frame source and replaced wholesale each tick.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
    pub data: Vec<u8>, // width * height * 4 bytes, row-major
}

impl Frame {
    /// Pack an `image` RGB buffer into a 4-channel frame of the given layout (alpha = 255).
    pub fn from_rgb(img: &image::RgbImage, layout: PixelLayout) -> Self {
        let (w, h) = img.dimensions();
        let (ro, go, bo) = layout.rgb_offsets();
        let mut data = vec![255u8; (w as usize) * (h as usize) * 4];
        for (px, out) in img.pixels().zip(data.chunks_exact_mut(4)) {
            out[ro] = px[0];
            out[go] = px[1];
            out[bo] = px[2];
        }
        Self { width: w, height: h, layout, data }
    }

    /// False for degenerate sizes or a buffer that does not cover width * height pixels.
    pub fn is_valid(&self) -> bool {
        self.width > MIN_FRAME_DIM
            && self.height > MIN_FRAME_DIM
            && self.data.len() == (self.width as usize) * (self.height as usize) * 4
    }

    /// (r, g, b) of pixel (x, y); caller keeps x/y in range.
    #[inline]
    pub fn rgb_at(&self, x: u32, y: u32) -> (u8, u8, u8) {
        let i = ((y as usize) * (self.width as usize) + x as usize) * 4;
        let (ro, go, bo) = self.layout.rgb_offsets();
        (self.data[i + ro], self.data[i + go], self.data[i + bo])
    }
}

/// Single-channel 8-bit plane. Used for both luminance and the 0/255 shadow mask.
#[derive(Debug, Clone, Default)]
pub struct Plane {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Plane {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; (width as usize) * (height as usize)],
        }
    }

    /// Match the given size. Returns true when the old storage was dropped and replaced.
    pub fn ensure_size(&mut self, width: u32, height: u32) -> bool {
        if self.width == width && self.height == height {
            return false;
        }
        // Replacing the Vec frees the previous allocation before we continue.
        *self = Plane::new(width, height);
        true
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[(y as usize) * (self.width as usize) + x as usize]
    }
}

pub type LumaBuffer = Plane;
pub type BinaryMask = Plane;

/// Integer pixel coordinate (x right, y down).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Closed boundary of one connected shadow region; the last point connects back to the first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contour {
    pub points: Vec<Point>,
}

/// Window-side buffer: each entry is 0x00RRGGBB for minifb.
#[derive(Clone)]
pub struct Canvas {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u32>,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, pixels: vec![0u32; width * height] }
    }

    pub fn fill(&mut self, color: u32) {
        self.pixels.fill(color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rgb_honours_layout() {
        let mut img = image::RgbImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgb([10, 20, 30]));
        let bgra = Frame::from_rgb(&img, PixelLayout::Bgra);
        assert_eq!(&bgra.data[0..4], &[30, 20, 10, 255]);
        let rgba = Frame::from_rgb(&img, PixelLayout::Rgba);
        assert_eq!(&rgba.data[0..4], &[10, 20, 30, 255]);
        assert_eq!(bgra.rgb_at(0, 0), rgba.rgb_at(0, 0));
    }

    #[test]
    fn tiny_or_short_frames_are_invalid() {
        let f = Frame { width: 16, height: 100, layout: PixelLayout::Bgra, data: vec![0; 16 * 100 * 4] };
        assert!(!f.is_valid());
        let f = Frame { width: 32, height: 32, layout: PixelLayout::Bgra, data: vec![0; 10] };
        assert!(!f.is_valid());
        let f = Frame { width: 17, height: 17, layout: PixelLayout::Rgba, data: vec![0; 17 * 17 * 4] };
        assert!(f.is_valid());
    }

    #[test]
    fn plane_reallocates_only_on_size_change() {
        let mut p = Plane::new(4, 4);
        p.data[0] = 7;
        assert!(!p.ensure_size(4, 4));
        assert_eq!(p.data[0], 7);
        assert!(p.ensure_size(2, 3));
        assert_eq!(p.data.len(), 6);
        assert!(p.data.iter().all(|&v| v == 0));
    }
}
