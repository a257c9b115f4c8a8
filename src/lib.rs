//! Shadow-driven snowball rolling.
//!
//! A webcam watches the floor; the player's shadow is thresholded out of each
//! frame, its largest region is traced and the travel of its centroid fills a
//! snowball from 0 to 100%. [`game::ProgressionController`] turns that
//! progress into animation signals, completion events and, after the last
//! snowball, a request to switch to the result scene.
//!
//! The host drives everything from its own loop:
//!
//! ```ignore
//! let tracker = ShadowTracker::open_camera(&cfg.camera, &cfg.tracking);
//! let mut game = ProgressionController::new(cfg.game.clone(), hooks);
//! game.bind(tracker);
//! loop {
//!     if let Some(t) = game.tracker_mut() {
//!         t.process_tick();
//!     }
//!     game.tick(dt);
//! }
//! ```

pub mod camera;
pub mod config;
pub mod contour;
pub mod convert;
pub mod draw;
pub mod error;
pub mod game;
pub mod progress;
pub mod synthetic;
pub mod tracker;
pub mod types;
pub mod vision;

pub use camera::{CameraCapture, FrameSource};
pub use config::Config;
pub use error::{Error, Result};
pub use game::{GameHooks, GameState, ProgressSource, ProgressionController};
pub use synthetic::SyntheticSource;
pub use tracker::{ShadowTracker, TickOutcome};
