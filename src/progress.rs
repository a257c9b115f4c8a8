// Accumulated shadow travel -> 0..100 snowball progress.

/// Distance-to-percent mapping for one snowball.
#[derive(Debug, Clone)]
pub struct ProgressModel {
    accumulated: f64,
    target: f64,
}

impl ProgressModel {
    /// `target_distance` must be > 0 (checked by `Config::validate`).
    pub fn new(target_distance: f64) -> Self {
        Self { accumulated: 0.0, target: target_distance }
    }

    /// Add travel. Negative or non-finite deltas are ignored so progress never goes backwards.
    pub fn accumulate(&mut self, delta: f64) {
        if delta.is_finite() && delta > 0.0 {
            self.accumulated += delta;
        }
    }

    pub fn reset(&mut self) {
        self.accumulated = 0.0;
    }

    pub fn accumulated_distance(&self) -> f64 {
        self.accumulated
    }

    pub fn target_distance(&self) -> f64 {
        self.target
    }

    /// `clamp(accumulated / target * 100, 0, 100)`.
    pub fn current_progress(&self) -> f32 {
        ((self.accumulated / self.target) * 100.0).clamp(0.0, 100.0) as f32
    }
}
