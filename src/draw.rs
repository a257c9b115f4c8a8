// Window + software drawing for the game screen.
// Visual pieces provided here:
// 1) A window that shows the camera frame (or the shadow mask).
// 2) A crosshair on the tracked shadow centroid.
// 3) Progress bar, indicator marker, stage dots.
// 4) A tiny 5x7 bitmap font for the HUD line.

use crate::error::{Error, Result};
use crate::types::{BinaryMask, Canvas, Frame};
use minifb::{Key, KeyRepeat, Window, WindowOptions};

pub struct Drawer {
    window: Window,
}

impl Drawer {
    /// Visual: a new empty window appears with your chosen title.
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self> {
        let mut window = Window::new(title, width, height, WindowOptions::default())
            .map_err(|e| Error::WindowInit(e.to_string()))?;
        window.set_target_fps(60);
        Ok(Self { window })
    }

    /// Push this frame's pixels to the screen.
    pub fn present(&mut self, canvas: &Canvas) -> Result<()> {
        self.window
            .update_with_buffer(&canvas.pixels, canvas.width, canvas.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))
    }

    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    pub fn esc_pressed(&self) -> bool {
        self.window.is_key_down(Key::Escape)
    }

    /// Edge-triggered key press (no auto-repeat).
    pub fn pressed_once(&self, key: Key) -> bool {
        self.window.is_key_pressed(key, KeyRepeat::No)
    }
}

/* ---------- Blits ---------- */

/// Nearest-neighbour scale of a camera frame onto the whole canvas.
pub fn blit_frame(canvas: &mut Canvas, frame: &Frame) {
    if frame.width == 0 || frame.height == 0 {
        return;
    }
    for cy in 0..canvas.height {
        let fy = (cy * frame.height as usize / canvas.height) as u32;
        for cx in 0..canvas.width {
            let fx = (cx * frame.width as usize / canvas.width) as u32;
            let (r, g, b) = frame.rgb_at(fx, fy);
            canvas.pixels[cy * canvas.width + cx] = rgb(r, g, b);
        }
    }
}

/// Shadow pixels in `color`, background black.
pub fn blit_mask(canvas: &mut Canvas, mask: &BinaryMask, color: u32) {
    if mask.width == 0 || mask.height == 0 {
        canvas.fill(0);
        return;
    }
    for cy in 0..canvas.height {
        let my = (cy * mask.height as usize / canvas.height) as u32;
        for cx in 0..canvas.width {
            let mx = (cx * mask.width as usize / canvas.width) as u32;
            canvas.pixels[cy * canvas.width + cx] = if mask.get(mx, my) != 0 { color } else { 0 };
        }
    }
}

#[inline]
pub fn rgb(r: u8, g: u8, b: u8) -> u32 {
    ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

/* ---------- Shapes ---------- */

#[inline]
fn put_pixel(canvas: &mut Canvas, x: i32, y: i32, color: u32) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as usize, y as usize);
    if x >= canvas.width || y >= canvas.height {
        return;
    }
    canvas.pixels[y * canvas.width + x] = color;
}

/// Bresenham line.
fn draw_line(canvas: &mut Canvas, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
    let (mut x0, mut y0) = (x0, y0);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        put_pixel(canvas, x0, y0, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// "+" with a small gap at the center; marks the shadow centroid.
pub fn draw_crosshair(canvas: &mut Canvas, cx: i32, cy: i32, size: i32, color: u32) {
    draw_line(canvas, cx - size, cy, cx - 2, cy, color);
    draw_line(canvas, cx + 2, cy, cx + size, cy, color);
    draw_line(canvas, cx, cy - size, cx, cy - 2, color);
    draw_line(canvas, cx, cy + 2, cx, cy + size, color);
    put_pixel(canvas, cx, cy, color);
}

pub fn fill_rect(canvas: &mut Canvas, x: i32, y: i32, w: i32, h: i32, color: u32) {
    for yy in y..y + h {
        for xx in x..x + w {
            put_pixel(canvas, xx, yy, color);
        }
    }
}

pub fn stroke_rect(canvas: &mut Canvas, x: i32, y: i32, w: i32, h: i32, color: u32) {
    draw_line(canvas, x, y, x + w - 1, y, color);
    draw_line(canvas, x, y + h - 1, x + w - 1, y + h - 1, color);
    draw_line(canvas, x, y, x, y + h - 1, color);
    draw_line(canvas, x + w - 1, y, x + w - 1, y + h - 1, color);
}

/// Horizontal bar filled to `fraction` (0..1).
pub fn draw_progress_bar(
    canvas: &mut Canvas,
    x: i32,
    y: i32,
    w: i32,
    h: i32,
    fraction: f32,
    fill: u32,
) {
    fill_rect(canvas, x, y, w, h, 0x00_20_20_20);
    let filled = ((w - 2) as f32 * fraction.clamp(0.0, 1.0)).round() as i32;
    fill_rect(canvas, x + 1, y + 1, filled, h - 2, fill);
    stroke_rect(canvas, x, y, w, h, 0x00_FF_FF_FF);
}

/// Small triangle pointing right (or left once flipped) at (cx, cy).
pub fn draw_indicator(canvas: &mut Canvas, cx: i32, cy: i32, flipped: bool, color: u32) {
    let dir = if flipped { -1 } else { 1 };
    for i in 0..6 {
        let x = cx - dir * 3 + dir * i;
        draw_line(canvas, x, cy - (5 - i), x, cy + (5 - i), color);
    }
}

/* ---------- 5x7 bitmap font ---------- */

/// Each u8 is a row; the low 5 bits are the pixels (bit 4 = leftmost).
fn glyph5x7(ch: char) -> Option<[u8; 7]> {
    macro_rules! g { ($a:expr,$b:expr,$c:expr,$d:expr,$e:expr,$f:expr,$g:expr) => {
        Some([$a,$b,$c,$d,$e,$f,$g])
    }; }

    match ch.to_ascii_uppercase() {
        '0' => g!(0b01110,0b10001,0b10011,0b10101,0b11001,0b10001,0b01110),
        '1' => g!(0b00100,0b01100,0b00100,0b00100,0b00100,0b00100,0b01110),
        '2' => g!(0b01110,0b10001,0b00001,0b00010,0b00100,0b01000,0b11111),
        '3' => g!(0b11110,0b00001,0b00001,0b01110,0b00001,0b00001,0b11110),
        '4' => g!(0b00010,0b00110,0b01010,0b10010,0b11111,0b00010,0b00010),
        '5' => g!(0b11111,0b10000,0b11110,0b00001,0b00001,0b10001,0b01110),
        '6' => g!(0b00110,0b01000,0b10000,0b11110,0b10001,0b10001,0b01110),
        '7' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b01000,0b01000),
        '8' => g!(0b01110,0b10001,0b10001,0b01110,0b10001,0b10001,0b01110),
        '9' => g!(0b01110,0b10001,0b10001,0b01111,0b00001,0b00010,0b01100),

        'A' => g!(0b01110,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'B' => g!(0b11110,0b10001,0b10001,0b11110,0b10001,0b10001,0b11110),
        'C' => g!(0b01110,0b10001,0b10000,0b10000,0b10000,0b10001,0b01110),
        'D' => g!(0b11100,0b10010,0b10001,0b10001,0b10001,0b10010,0b11100),
        'E' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b11111),
        'F' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b10000),
        'G' => g!(0b01110,0b10001,0b10000,0b10111,0b10001,0b10001,0b01111),
        'H' => g!(0b10001,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'I' => g!(0b01110,0b00100,0b00100,0b00100,0b00100,0b00100,0b01110),
        'J' => g!(0b00111,0b00010,0b00010,0b00010,0b00010,0b10010,0b01100),
        'K' => g!(0b10001,0b10010,0b10100,0b11000,0b10100,0b10010,0b10001),
        'L' => g!(0b10000,0b10000,0b10000,0b10000,0b10000,0b10000,0b11111),
        'M' => g!(0b10001,0b11011,0b10101,0b10101,0b10001,0b10001,0b10001),
        'N' => g!(0b10001,0b10001,0b11001,0b10101,0b10011,0b10001,0b10001),
        'O' => g!(0b01110,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'P' => g!(0b11110,0b10001,0b10001,0b11110,0b10000,0b10000,0b10000),
        'Q' => g!(0b01110,0b10001,0b10001,0b10001,0b10101,0b10010,0b01101),
        'R' => g!(0b11110,0b10001,0b10001,0b11110,0b10100,0b10010,0b10001),
        'S' => g!(0b01111,0b10000,0b10000,0b01110,0b00001,0b00001,0b11110),
        'T' => g!(0b11111,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        'U' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'V' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b01010,0b00100),
        'W' => g!(0b10001,0b10001,0b10001,0b10101,0b10101,0b10101,0b01010),
        'X' => g!(0b10001,0b10001,0b01010,0b00100,0b01010,0b10001,0b10001),
        'Y' => g!(0b10001,0b10001,0b01010,0b00100,0b00100,0b00100,0b00100),
        'Z' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b10000,0b11111),

        ' ' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b00000),
        '|' => g!(0b00100,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        ':' => g!(0b00000,0b00100,0b00000,0b00000,0b00100,0b00000,0b00000),
        '.' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00100,0b00000),
        '/' => g!(0b00001,0b00010,0b00010,0b00100,0b01000,0b01000,0b10000),
        '%' => g!(0b11000,0b11001,0b00010,0b00100,0b01000,0b10011,0b00011),
        '-' => g!(0b00000,0b00000,0b00000,0b11111,0b00000,0b00000,0b00000),

        _ => None,
    }
}

/// One glyph with a 1-pixel black drop shadow for contrast.
fn draw_char_5x7(canvas: &mut Canvas, x: i32, y: i32, ch: char, color: u32) {
    let Some(rows) = glyph5x7(ch) else {
        return;
    };
    for (offset, c) in [(1, 0x00000000), (0, color)] {
        for (ry, rowbits) in rows.iter().enumerate() {
            for rx in 0..5 {
                if (rowbits & (1 << (4 - rx))) != 0 {
                    put_pixel(canvas, x + rx + offset, y + ry as i32 + offset, c);
                }
            }
        }
    }
}

/// 6 px advance per glyph (5 wide + 1 spacing). Unknown characters leave a gap.
pub fn draw_text_5x7(canvas: &mut Canvas, mut x: i32, y: i32, text: &str, color: u32) {
    for ch in text.chars() {
        draw_char_5x7(canvas, x, y, ch, color);
        x += 6;
    }
}

pub fn text_width(text: &str) -> i32 {
    text.chars().count() as i32 * 6
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PixelLayout, Plane};

    #[test]
    fn hud_strings_are_fully_covered_by_the_font() {
        for s in ["PROGRESS 99.5%", "SNOWBALLS 2/3", "no camera", "result scene - press enter"] {
            assert!(s.chars().all(|c| glyph5x7(c).is_some()), "{s}");
        }
    }

    #[test]
    fn frame_blit_scales_to_canvas() {
        let img = image::RgbImage::from_fn(20, 20, |x, _| {
            if x < 10 { image::Rgb([255, 0, 0]) } else { image::Rgb([0, 0, 255]) }
        });
        let frame = Frame::from_rgb(&img, PixelLayout::Bgra);
        let mut canvas = Canvas::new(40, 10);
        blit_frame(&mut canvas, &frame);
        assert_eq!(canvas.pixels[0], 0x00_FF_00_00);
        assert_eq!(canvas.pixels[39], 0x00_00_00_FF);
    }

    #[test]
    fn mask_blit_colors_shadow_only() {
        let mut mask = Plane::new(2, 1);
        mask.data[1] = 255;
        let mut canvas = Canvas::new(4, 2);
        blit_mask(&mut canvas, &mask, 0x00_12_34_56);
        assert_eq!(&canvas.pixels[0..4], &[0, 0, 0x00_12_34_56, 0x00_12_34_56]);
    }

    #[test]
    fn drawing_off_canvas_is_clipped() {
        let mut canvas = Canvas::new(8, 8);
        draw_crosshair(&mut canvas, -20, 100, 12, 0x00_FF_FF_FF);
        fill_rect(&mut canvas, 6, 6, 10, 10, 0x00_00_FF_00);
        assert_eq!(canvas.pixels[63], 0x00_00_FF_00);
        assert_eq!(canvas.pixels[0], 0);
    }
}
