//! The per-tick shadow pipeline:
//! frame source -> luminance -> shadow mask -> largest region -> centroid travel -> progress.
//!
//! Nothing here is fatal. With no camera the tracker is inert; a tick without a
//! new frame or with a degenerate frame leaves every piece of state untouched;
//! losing the shadow only drops the centroid baseline.

use crate::camera::{CameraCapture, FrameSource};
use crate::config::{CameraConfig, TrackingConfig};
use crate::contour::{ContourTracker, Observation, TrackState};
use crate::convert::FrameConverter;
use crate::game::ProgressSource;
use crate::progress::ProgressModel;
use crate::types::{BinaryMask, Frame};
use crate::vision::ShadowExtractor;
use tracing::{info, trace, warn};

/// What happened on one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// No frame source (camera missing or closed).
    Inert,
    /// Source had nothing new this tick.
    NoFrame,
    /// Frame skipped; too small or its buffer does not match its size.
    InvalidResolution { width: u32, height: u32 },
    Tracked(Observation),
}

pub struct ShadowTracker {
    source: Option<Box<dyn FrameSource>>,
    converter: FrameConverter,
    extractor: ShadowExtractor,
    contours: ContourTracker,
    progress: ProgressModel,
    min_area: f64,
    last_centroid: Option<(f64, f64)>,
    frame_size: Option<(u32, u32)>,
}

impl ShadowTracker {
    pub fn new(source: Option<Box<dyn FrameSource>>, cfg: &TrackingConfig) -> Self {
        Self {
            source,
            converter: FrameConverter::new(),
            extractor: ShadowExtractor::new(cfg.threshold),
            contours: ContourTracker::new(),
            progress: ProgressModel::new(cfg.target_distance),
            min_area: cfg.min_area,
            last_centroid: None,
            frame_size: None,
        }
    }

    pub fn with_source(source: impl FrameSource + 'static, cfg: &TrackingConfig) -> Self {
        Self::new(Some(Box::new(source)), cfg)
    }

    /// Open the configured camera. A missing device leaves the tracker inert instead of failing.
    pub fn open_camera(camera: &CameraConfig, cfg: &TrackingConfig) -> Self {
        let source = match CameraCapture::open(
            camera.device_index,
            camera.width,
            camera.height,
            camera.pixel_layout,
        ) {
            Ok(cam) => Some(Box::new(cam) as Box<dyn FrameSource>),
            Err(e) => {
                warn!("{e}; shadow tracking stays inert");
                None
            }
        };
        Self::new(source, cfg)
    }

    pub fn is_inert(&self) -> bool {
        self.source.is_none()
    }

    /// Advance the pipeline by one display tick. Never blocks waiting for a frame.
    pub fn process_tick(&mut self) -> TickOutcome {
        let Some(source) = self.source.as_mut() else {
            return TickOutcome::Inert;
        };
        if !source.poll() {
            return TickOutcome::NoFrame;
        }
        let Some(frame) = source.current_frame() else {
            return TickOutcome::NoFrame;
        };
        if !frame.is_valid() {
            trace!(width = frame.width, height = frame.height, "skipping invalid frame");
            return TickOutcome::InvalidResolution { width: frame.width, height: frame.height };
        }

        let size = (frame.width, frame.height);
        if self.frame_size.is_some_and(|old| old != size) {
            // Centroids from different resolutions are not comparable.
            info!("frame size changed to {}x{}; re-anchoring", size.0, size.1);
            self.contours.reset();
        }
        self.frame_size = Some(size);

        let luma = self.converter.to_luminance(frame);
        let mask = self.extractor.threshold(luma);
        let observation = self.contours.observe(mask, self.min_area);
        self.progress.accumulate(observation.distance());
        self.last_centroid = observation.centroid();
        TickOutcome::Tracked(observation)
    }

    pub fn current_progress(&self) -> f32 {
        self.progress.current_progress()
    }

    pub fn accumulated_distance(&self) -> f64 {
        self.progress.accumulated_distance()
    }

    /// Zero progress and drop the centroid baseline.
    pub fn reset_progress(&mut self) {
        self.progress.reset();
        self.contours.reset();
        self.last_centroid = None;
    }

    pub fn track_state(&self) -> TrackState {
        self.contours.state()
    }

    pub fn threshold(&self) -> u8 {
        self.extractor.level
    }

    pub fn set_threshold(&mut self, level: u8) {
        self.extractor.level = level;
    }

    pub fn set_min_area(&mut self, min_area: f64) {
        self.min_area = min_area.max(0.0);
    }

    /// Centroid found on the last processed frame, if any.
    pub fn last_centroid(&self) -> Option<(f64, f64)> {
        self.last_centroid
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.source.as_ref()?.current_frame()
    }

    pub fn mask(&self) -> &BinaryMask {
        self.extractor.mask()
    }

    /// Release the frame source. Idempotent; the tracker is inert afterwards.
    pub fn close(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.close();
            info!("shadow tracker closed");
        }
    }
}

impl Drop for ShadowTracker {
    fn drop(&mut self) {
        self.close();
    }
}

impl ProgressSource for ShadowTracker {
    fn current_progress(&self) -> f32 {
        ShadowTracker::current_progress(self)
    }

    fn reset_progress(&mut self) {
        ShadowTracker::reset_progress(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::SyntheticSource;
    use crate::types::PixelLayout;

    fn cfg(target: f64) -> TrackingConfig {
        TrackingConfig { threshold: 30, min_area: 500.0, target_distance: target }
    }

    #[test]
    fn no_source_is_inert() {
        let mut t = ShadowTracker::new(None, &cfg(100.0));
        assert!(t.is_inert());
        assert_eq!(t.process_tick(), TickOutcome::Inert);
        assert_eq!(t.current_progress(), 0.0);
        t.close();
        t.close();
    }

    #[test]
    fn idle_ticks_change_nothing() {
        let src = SyntheticSource::new(200, 100, PixelLayout::Bgra)
            .push_disc(50.0, 50.0)
            .push_idle()
            .push_disc(90.0, 50.0);
        let mut t = ShadowTracker::with_source(src, &cfg(1000.0));
        assert!(matches!(t.process_tick(), TickOutcome::Tracked(Observation::Anchored { .. })));
        let before = (t.current_progress(), t.track_state());
        assert_eq!(t.process_tick(), TickOutcome::NoFrame);
        assert_eq!((t.current_progress(), t.track_state()), before);
        let TickOutcome::Tracked(Observation::Moved { distance, .. }) = t.process_tick() else {
            panic!("expected movement");
        };
        assert!((distance - 40.0).abs() < 0.5);
        assert!((t.accumulated_distance() - distance).abs() < 1e-9);
    }

    #[test]
    fn tiny_frames_are_skipped_without_touching_state() {
        let src = SyntheticSource::new(200, 100, PixelLayout::Bgra)
            .push_disc(50.0, 50.0)
            .resize(16, 16)
            .push_empty();
        let mut t = ShadowTracker::with_source(src, &cfg(1000.0));
        t.process_tick();
        let before = t.track_state();
        assert_eq!(t.process_tick(), TickOutcome::InvalidResolution { width: 16, height: 16 });
        assert_eq!(t.track_state(), before);
        assert!(before.initialized);
    }

    #[test]
    fn resolution_change_reanchors() {
        let src = SyntheticSource::new(640, 480, PixelLayout::Bgra)
            .push_disc(300.0, 200.0)
            .resize(320, 240)
            .push_disc(100.0, 100.0)
            .push_disc(120.0, 100.0);
        let mut t = ShadowTracker::with_source(src, &cfg(1000.0));
        t.process_tick();
        assert!(matches!(t.process_tick(), TickOutcome::Tracked(Observation::Anchored { .. })));
        assert_eq!(t.accumulated_distance(), 0.0);
        assert!(matches!(t.process_tick(), TickOutcome::Tracked(Observation::Moved { .. })));
        assert!((t.accumulated_distance() - 20.0).abs() < 0.5);
    }

    #[test]
    fn reset_clears_progress_and_baseline() {
        let src = SyntheticSource::new(200, 100, PixelLayout::Rgba)
            .push_disc(50.0, 50.0)
            .push_disc(100.0, 50.0);
        let mut t = ShadowTracker::with_source(src, &cfg(100.0));
        t.process_tick();
        t.process_tick();
        assert!(t.current_progress() > 40.0);
        t.reset_progress();
        assert_eq!(t.current_progress(), 0.0);
        assert!(!t.track_state().initialized);
        assert_eq!(t.last_centroid(), None);
    }

    #[test]
    fn close_makes_tracker_inert() {
        let src = SyntheticSource::orbit(120, 120, PixelLayout::Bgra);
        let mut t = ShadowTracker::with_source(src, &cfg(100.0));
        assert!(matches!(t.process_tick(), TickOutcome::Tracked(_)));
        t.close();
        assert_eq!(t.process_tick(), TickOutcome::Inert);
        assert!(t.last_frame().is_none());
    }
}
