use crate::error::{Error, Result};
use crate::types::PixelLayout;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CameraConfig {
    #[serde(default)]
    pub device_index: u32,
    /// Advisory only: the device may negotiate something else.
    #[serde(default = "CameraConfig::default_width")]
    pub width: u32,
    #[serde(default = "CameraConfig::default_height")]
    pub height: u32,
    #[serde(default)]
    pub pixel_layout: PixelLayout,
}

impl CameraConfig {
    fn default_width() -> u32 {
        640
    }
    fn default_height() -> u32 {
        480
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            width: Self::default_width(),
            height: Self::default_height(),
            pixel_layout: PixelLayout::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackingConfig {
    /// Pixels darker than this luminance are shadow. Fixed; no auto-exposure compensation.
    #[serde(default = "TrackingConfig::default_threshold")]
    pub threshold: u8,
    /// Regions with area at or below this are noise.
    #[serde(default = "TrackingConfig::default_min_area")]
    pub min_area: f64,
    /// Centroid travel (pixels) that fills one snowball to 100%.
    #[serde(default = "TrackingConfig::default_target_distance")]
    pub target_distance: f64,
}

impl TrackingConfig {
    fn default_threshold() -> u8 {
        30
    }
    fn default_min_area() -> f64 {
        1000.0
    }
    fn default_target_distance() -> f64 {
        5000.0
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            threshold: Self::default_threshold(),
            min_area: Self::default_min_area(),
            target_distance: Self::default_target_distance(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameConfig {
    #[serde(default = "GameConfig::default_total_snowballs")]
    pub total_snowballs: u32,
    /// Per-tick blend factor is `dt * animation_smoothing_speed`.
    #[serde(default = "GameConfig::default_animation_smoothing_speed")]
    pub animation_smoothing_speed: f32,
    /// Per-tick blend factor is `dt * movement_smoothing_speed`.
    #[serde(default = "GameConfig::default_movement_smoothing_speed")]
    pub movement_smoothing_speed: f32,
    /// Smoothed rate (percent per second) that starts the progress audio cue.
    #[serde(default = "GameConfig::default_min_rate_threshold")]
    pub min_rate_threshold: f32,
    #[serde(default = "GameConfig::default_indicator_start_x")]
    pub indicator_start_x: f32,
    #[serde(default = "GameConfig::default_indicator_end_x")]
    pub indicator_end_x: f32,
    #[serde(default = "GameConfig::default_result_scene")]
    pub result_scene: String,
}

impl GameConfig {
    fn default_total_snowballs() -> u32 {
        3
    }
    fn default_animation_smoothing_speed() -> f32 {
        5.0
    }
    fn default_movement_smoothing_speed() -> f32 {
        3.0
    }
    fn default_min_rate_threshold() -> f32 {
        0.5
    }
    fn default_indicator_start_x() -> f32 {
        -5.0
    }
    fn default_indicator_end_x() -> f32 {
        5.0
    }
    fn default_result_scene() -> String {
        "ResultScene".to_string()
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            total_snowballs: Self::default_total_snowballs(),
            animation_smoothing_speed: Self::default_animation_smoothing_speed(),
            movement_smoothing_speed: Self::default_movement_smoothing_speed(),
            min_rate_threshold: Self::default_min_rate_threshold(),
            indicator_start_x: Self::default_indicator_start_x(),
            indicator_end_x: Self::default_indicator_end_x(),
            result_scene: Self::default_result_scene(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub game: GameConfig,
}

impl Config {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: Config = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        let t = &self.tracking;
        if !(t.target_distance.is_finite() && t.target_distance > 0.0) {
            return Err(Error::config(format!(
                "tracking.target_distance must be > 0 (got {})",
                t.target_distance
            )));
        }
        if !(t.min_area.is_finite() && t.min_area >= 0.0) {
            return Err(Error::config(format!(
                "tracking.min_area must be >= 0 (got {})",
                t.min_area
            )));
        }
        let g = &self.game;
        if g.total_snowballs == 0 {
            return Err(Error::config("game.total_snowballs must be at least 1"));
        }
        if g.animation_smoothing_speed < 0.0 || g.movement_smoothing_speed < 0.0 {
            return Err(Error::config("smoothing speeds must not be negative"));
        }
        Ok(())
    }
}
