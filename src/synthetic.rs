// Scripted frame source: a dark disc ("the shadow") on a bright floor.
// Drives the tests and the `--synthetic` demo mode when no camera is attached.

use crate::camera::FrameSource;
use crate::types::{Frame, PixelLayout};
use std::collections::VecDeque;

const FLOOR: u8 = 220;
const SHADOW: u8 = 12;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Shot {
    /// Deliver a frame of this size; `Some` places the disc center.
    Frame { width: u32, height: u32, disc: Option<(f32, f32)> },
    /// Nothing new this tick.
    Idle,
}

#[derive(Debug, Clone)]
enum Script {
    Queue(VecDeque<Shot>),
    /// Endless circular walk around the frame center; every `gap_every`-th frame is empty.
    Orbit { step: u32, radius_px: f32, speed: f32, gap_every: u32 },
}

pub struct SyntheticSource {
    width: u32,
    height: u32,
    disc_radius: f32,
    layout: PixelLayout,
    script: Script,
    latest: Option<Frame>,
    closed: bool,
}

impl SyntheticSource {
    /// Empty script; add shots with the `push_*` methods.
    pub fn new(width: u32, height: u32, layout: PixelLayout) -> Self {
        Self {
            width,
            height,
            disc_radius: 30.0,
            layout,
            script: Script::Queue(VecDeque::new()),
            latest: None,
            closed: false,
        }
    }

    /// Never-ending orbit, for the demo binary.
    pub fn orbit(width: u32, height: u32, layout: PixelLayout) -> Self {
        let radius_px = (width.min(height) as f32) * 0.3;
        Self {
            script: Script::Orbit { step: 0, radius_px, speed: 0.05, gap_every: 90 },
            ..Self::new(width, height, layout)
        }
    }

    pub fn with_disc_radius(mut self, radius: f32) -> Self {
        self.disc_radius = radius;
        self
    }

    /// Queue a frame with the disc centered at (x, y).
    pub fn push_disc(mut self, x: f32, y: f32) -> Self {
        let shot = Shot::Frame { width: self.width, height: self.height, disc: Some((x, y)) };
        self.queue(shot);
        self
    }

    /// Queue a frame with no shadow in it.
    pub fn push_empty(mut self) -> Self {
        let shot = Shot::Frame { width: self.width, height: self.height, disc: None };
        self.queue(shot);
        self
    }

    /// Queue a tick on which no new frame arrives.
    pub fn push_idle(mut self) -> Self {
        self.queue(Shot::Idle);
        self
    }

    /// Later shots use this resolution (simulates device renegotiation).
    pub fn resize(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    fn queue(&mut self, shot: Shot) {
        if let Script::Queue(q) = &mut self.script {
            q.push_back(shot);
        }
    }

    fn next_shot(&mut self) -> Shot {
        match &mut self.script {
            Script::Queue(q) => q.pop_front().unwrap_or(Shot::Idle),
            Script::Orbit { step, radius_px, speed, gap_every } => {
                *step += 1;
                let (w, h) = (self.width, self.height);
                if *gap_every > 0 && *step % *gap_every == 0 {
                    return Shot::Frame { width: w, height: h, disc: None };
                }
                let a = *step as f32 * *speed;
                let cx = w as f32 * 0.5 + *radius_px * a.cos();
                let cy = h as f32 * 0.5 + *radius_px * a.sin();
                Shot::Frame { width: w, height: h, disc: Some((cx, cy)) }
            }
        }
    }

    fn render(&self, width: u32, height: u32, disc: Option<(f32, f32)>) -> Frame {
        let mut data = vec![FLOOR; (width as usize) * (height as usize) * 4];
        if let Some((cx, cy)) = disc {
            let r = self.disc_radius;
            let r2 = r * r;
            let y0 = (cy - r).floor().max(0.0) as u32;
            let y1 = ((cy + r).ceil() as u32).min(height.saturating_sub(1));
            let x0 = (cx - r).floor().max(0.0) as u32;
            let x1 = ((cx + r).ceil() as u32).min(width.saturating_sub(1));
            for y in y0..=y1 {
                for x in x0..=x1 {
                    let dx = x as f32 - cx;
                    let dy = y as f32 - cy;
                    if dx * dx + dy * dy <= r2 {
                        let i = ((y as usize) * (width as usize) + x as usize) * 4;
                        data[i..i + 3].fill(SHADOW);
                    }
                }
            }
        }
        Frame { width, height, layout: self.layout, data }
    }
}

impl FrameSource for SyntheticSource {
    fn poll(&mut self) -> bool {
        if self.closed {
            return false;
        }
        match self.next_shot() {
            Shot::Idle => false,
            Shot::Frame { width, height, disc } => {
                self.latest = Some(self.render(width, height, disc));
                true
            }
        }
    }

    fn current_frame(&self) -> Option<&Frame> {
        self.latest.as_ref()
    }

    fn resolution(&self) -> (u32, u32) {
        self.latest
            .as_ref()
            .map(|f| (f.width, f.height))
            .unwrap_or((self.width, self.height))
    }

    fn close(&mut self) {
        self.closed = true;
        self.latest = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_shots_play_in_order() {
        let mut src = SyntheticSource::new(64, 48, PixelLayout::Bgra)
            .with_disc_radius(5.0)
            .push_disc(20.0, 20.0)
            .push_idle()
            .push_empty();

        assert!(src.poll());
        let f = src.current_frame().unwrap();
        assert_eq!(f.rgb_at(20, 20), (SHADOW, SHADOW, SHADOW));
        assert_eq!(f.rgb_at(0, 0), (FLOOR, FLOOR, FLOOR));

        assert!(!src.poll());
        assert!(src.poll());
        assert_eq!(src.current_frame().unwrap().rgb_at(20, 20), (FLOOR, FLOOR, FLOOR));
        assert!(!src.poll(), "exhausted script is idle");
    }

    #[test]
    fn resize_changes_later_frames() {
        let mut src = SyntheticSource::new(64, 48, PixelLayout::Rgba)
            .push_empty()
            .resize(32, 24)
            .push_empty();
        src.poll();
        assert_eq!(src.resolution(), (64, 48));
        src.poll();
        assert_eq!(src.resolution(), (32, 24));
    }

    #[test]
    fn close_is_idempotent_and_silences_source() {
        let mut src = SyntheticSource::orbit(64, 64, PixelLayout::Bgra);
        assert!(src.poll());
        src.close();
        src.close();
        assert!(!src.poll());
        assert!(src.current_frame().is_none());
    }
}
