//! Snowball progression: turns the tracker's 0..100 progress into animation
//! signals, one-shot completion events, stage reveals, and finally the
//! request to move on to the result scene.
//!
//! One controller lives for the whole session and is handed to whoever needs
//! it; the host attaches a tracker with [`ProgressionController::bind`] when
//! the creation scene comes up and detaches it with
//! [`ProgressionController::unbind`] when it goes away. All timing comes in
//! through `tick(dt)`.
//!
//! ```text
//!   Idle --bind--> Tracking --progress 100--> Completed --+--> Tracking     (more snowballs to make)
//!    ^                                                    +--> EpisodeDone  (all made; result scene)
//!    +------------------------ unbind (any state) --------+
//! ```

use crate::config::GameConfig;
use tracing::{debug, info};

/// Progress at or above `100 - COMPLETION_EPSILON` counts as a finished snowball.
pub const COMPLETION_EPSILON: f32 = 1e-4;
/// The finalize ramp covers the last 10% of progress.
pub const FINALIZE_START: f32 = 90.0;
pub const FINALIZE_END: f32 = 100.0;
/// Indicator counts as "at the end" within this distance.
pub const FLIP_TOLERANCE: f32 = 0.01;

/// Anything that reports and can reset snowball progress. The shadow tracker is the real one.
pub trait ProgressSource {
    fn current_progress(&self) -> f32;
    fn reset_progress(&mut self);
}

/// Outbound signals to animation, audio and scene code. Every method defaults to a no-op.
pub trait GameHooks {
    /// Smoothed progress rate (percent per second) for the rolling animation.
    fn set_rate_param(&mut self, _rate: f32) {}
    /// 0..1 ramp over the last 10% of progress.
    fn set_finalize_param(&mut self, _value: f32) {}
    fn is_cue_playing(&self) -> bool {
        false
    }
    fn play_progress_cue(&mut self) {}
    /// Fired once per finished snowball with the new completed count.
    fn snowball_completed(&mut self, _completed: u32) {}
    /// Reveal stage visuals `0..=index`.
    fn show_stage(&mut self, _index: usize) {}
    fn hide_all_stages(&mut self) {}
    fn set_indicator(&mut self, _x: f32, _flipped: bool) {}
    /// All snowballs made: switch to `scene`.
    fn episode_complete(&mut self, _scene: &str) {}
}

/// Hooks that ignore everything.
impl GameHooks for () {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    /// No tracker attached.
    Idle,
    Tracking,
    /// Progress hit 100 and is being consumed.
    Completed,
    /// Every snowball is made; nothing fires until `restart` or a fresh `bind`.
    EpisodeDone,
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

/// Marker that slides from `start_x` to `end_x` as the snowball fills, then turns around once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Indicator {
    pub x: f32,
    pub flipped: bool,
    start_x: f32,
    end_x: f32,
}

impl Indicator {
    pub fn new(start_x: f32, end_x: f32) -> Self {
        Self { x: start_x, flipped: false, start_x, end_x }
    }

    pub fn reset(&mut self) {
        self.x = self.start_x;
        self.flipped = false;
    }

    /// Ease toward the position for `progress` and flip on arrival at the end.
    pub fn step(&mut self, progress: f32, dt: f32, speed: f32) {
        let target = lerp(self.start_x, self.end_x, progress / 100.0);
        self.x = lerp(self.x, target, dt * speed);
        if (self.x - self.end_x).abs() < FLIP_TOLERANCE {
            self.flip();
        }
    }

    /// Returns true only when this call turned it around.
    pub fn flip(&mut self) -> bool {
        if self.flipped {
            return false;
        }
        self.flipped = true;
        true
    }

    /// Position between the endpoints as 0..1.
    pub fn normalized(&self) -> f32 {
        let span = self.end_x - self.start_x;
        if span.abs() <= f32::EPSILON {
            return 0.0;
        }
        ((self.x - self.start_x) / span).clamp(0.0, 1.0)
    }
}

pub struct ProgressionController<T: ProgressSource, H: GameHooks> {
    cfg: GameConfig,
    hooks: H,
    tracker: Option<T>,
    state: GameState,
    completed: u32,
    handled_current: bool,
    previous_progress: f32,
    current_progress: f32,
    rate: f32,
    animated_rate: f32,
    finalize: f32,
    cue_armed: bool,
    indicator: Indicator,
}

impl<T: ProgressSource, H: GameHooks> ProgressionController<T, H> {
    pub fn new(cfg: GameConfig, mut hooks: H) -> Self {
        hooks.hide_all_stages();
        let indicator = Indicator::new(cfg.indicator_start_x, cfg.indicator_end_x);
        Self {
            cfg,
            hooks,
            tracker: None,
            state: GameState::Idle,
            completed: 0,
            handled_current: false,
            previous_progress: 0.0,
            current_progress: 0.0,
            rate: 0.0,
            animated_rate: 0.0,
            finalize: 0.0,
            cue_armed: true,
            indicator,
        }
    }

    /// Attach a tracker (creation scene loaded). Returns the one it replaces, if any.
    /// After a finished run this also starts a new run from zero.
    pub fn bind(&mut self, mut tracker: T) -> Option<T> {
        if self.completed >= self.cfg.total_snowballs {
            self.start_new_run();
        }
        tracker.reset_progress();
        let old = self.tracker.replace(tracker);
        self.reset_unit_state();
        self.handled_current = false;
        self.state = GameState::Tracking;
        info!(completed = self.completed, total = self.cfg.total_snowballs, "tracker bound");
        old
    }

    /// Detach the tracker (scene unloaded). Smoothed values decay on later ticks.
    pub fn unbind(&mut self) -> Option<T> {
        let old = self.tracker.take();
        if old.is_some() || self.state != GameState::Idle {
            info!("tracker unbound");
        }
        self.state = GameState::Idle;
        old
    }

    /// Explicit restart after `EpisodeDone`: counter back to zero, stages hidden.
    pub fn restart(&mut self) {
        self.start_new_run();
        if let Some(t) = self.tracker.as_mut() {
            t.reset_progress();
        }
        self.reset_unit_state();
        self.handled_current = false;
        self.state = if self.tracker.is_some() { GameState::Tracking } else { GameState::Idle };
    }

    /// Start the current snowball over without touching the completed count.
    pub fn reset_current(&mut self) {
        if let Some(t) = self.tracker.as_mut() {
            t.reset_progress();
        }
        self.reset_unit_state();
        self.handled_current = false;
        debug!("current snowball reset");
    }

    pub fn tick(&mut self, dt: f32) {
        match self.state {
            GameState::Tracking => self.tick_tracking(dt),
            GameState::Idle | GameState::EpisodeDone | GameState::Completed => self.decay(dt),
        }
    }

    fn tick_tracking(&mut self, dt: f32) {
        let Some(tracker) = self.tracker.as_ref() else {
            self.state = GameState::Idle;
            self.decay(dt);
            return;
        };
        let progress = tracker.current_progress();

        self.rate = if dt > 0.0 { (progress - self.previous_progress) / dt } else { 0.0 };
        self.animated_rate = lerp(
            self.animated_rate,
            self.rate,
            dt.max(0.0) * self.cfg.animation_smoothing_speed,
        );
        self.hooks.set_rate_param(self.animated_rate);
        self.update_cue();

        self.previous_progress = progress;
        self.current_progress = progress;

        self.indicator.step(progress, dt.max(0.0), self.cfg.movement_smoothing_speed);
        self.hooks.set_indicator(self.indicator.x, self.indicator.flipped);

        self.finalize = ((progress - FINALIZE_START) / (FINALIZE_END - FINALIZE_START)).clamp(0.0, 1.0);
        self.hooks.set_finalize_param(self.finalize);

        if !self.handled_current && progress >= 100.0 - COMPLETION_EPSILON {
            self.handled_current = true;
            self.complete_snowball();
        }
    }

    // One cue per stretch of the smoothed rate staying above the threshold.
    fn update_cue(&mut self) {
        let above = self.animated_rate > 0.0 && self.animated_rate >= self.cfg.min_rate_threshold;
        if !above {
            self.cue_armed = true;
            return;
        }
        if self.cue_armed && !self.hooks.is_cue_playing() {
            self.hooks.play_progress_cue();
            self.cue_armed = false;
        }
    }

    fn complete_snowball(&mut self) {
        self.state = GameState::Completed;
        self.completed += 1;
        info!(completed = self.completed, total = self.cfg.total_snowballs, "snowball completed");
        self.hooks.snowball_completed(self.completed);
        self.hooks.show_stage((self.completed - 1) as usize);

        if let Some(t) = self.tracker.as_mut() {
            t.reset_progress();
        }
        if self.completed < self.cfg.total_snowballs {
            self.reset_unit_state();
            self.handled_current = false;
            self.state = GameState::Tracking;
        } else {
            self.current_progress = 0.0;
            self.previous_progress = 0.0;
            self.state = GameState::EpisodeDone;
            info!(scene = %self.cfg.result_scene, "all snowballs made; requesting scene change");
            self.hooks.episode_complete(&self.cfg.result_scene);
        }
    }

    fn decay(&mut self, dt: f32) {
        let factor = dt.max(0.0) * self.cfg.animation_smoothing_speed * 2.0;
        self.animated_rate = lerp(self.animated_rate, 0.0, factor);
        self.hooks.set_rate_param(self.animated_rate);
        self.finalize = 0.0;
        self.hooks.set_finalize_param(0.0);
    }

    fn reset_unit_state(&mut self) {
        self.previous_progress = 0.0;
        self.current_progress = 0.0;
        self.rate = 0.0;
        self.animated_rate = 0.0;
        self.finalize = 0.0;
        self.cue_armed = true;
        self.hooks.set_rate_param(0.0);
        self.hooks.set_finalize_param(0.0);
        self.indicator.reset();
        self.hooks.set_indicator(self.indicator.x, self.indicator.flipped);
    }

    fn start_new_run(&mut self) {
        self.completed = 0;
        self.hooks.hide_all_stages();
        debug!("new snowman run");
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn completed_count(&self) -> u32 {
        self.completed
    }

    pub fn total_target(&self) -> u32 {
        self.cfg.total_snowballs
    }

    /// Progress as of the last tick (read-only view for the UI).
    pub fn current_progress(&self) -> f32 {
        self.current_progress
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn animated_rate(&self) -> f32 {
        self.animated_rate
    }

    pub fn finalize(&self) -> f32 {
        self.finalize
    }

    pub fn indicator(&self) -> &Indicator {
        &self.indicator
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    pub fn is_bound(&self) -> bool {
        self.tracker.is_some()
    }

    pub fn tracker(&self) -> Option<&T> {
        self.tracker.as_ref()
    }

    pub fn tracker_mut(&mut self) -> Option<&mut T> {
        self.tracker.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Fake {
        progress: f32,
        resets: u32,
    }

    impl ProgressSource for Fake {
        fn current_progress(&self) -> f32 {
            self.progress
        }
        fn reset_progress(&mut self) {
            self.progress = 0.0;
            self.resets += 1;
        }
    }

    #[derive(Default)]
    struct Log {
        rate: f32,
        finalize: f32,
        cues: u32,
        cue_playing: bool,
        completions: Vec<u32>,
        stages: Vec<usize>,
        hides: u32,
        scenes: Vec<String>,
    }

    impl GameHooks for Log {
        fn set_rate_param(&mut self, rate: f32) {
            self.rate = rate;
        }
        fn set_finalize_param(&mut self, value: f32) {
            self.finalize = value;
        }
        fn is_cue_playing(&self) -> bool {
            self.cue_playing
        }
        fn play_progress_cue(&mut self) {
            self.cues += 1;
        }
        fn snowball_completed(&mut self, completed: u32) {
            self.completions.push(completed);
        }
        fn show_stage(&mut self, index: usize) {
            self.stages.push(index);
        }
        fn hide_all_stages(&mut self) {
            self.hides += 1;
        }
        fn episode_complete(&mut self, scene: &str) {
            self.scenes.push(scene.to_string());
        }
    }

    fn game(total: u32) -> ProgressionController<Fake, Log> {
        let cfg = GameConfig { total_snowballs: total, ..GameConfig::default() };
        ProgressionController::new(cfg, Log::default())
    }

    fn set(g: &mut ProgressionController<Fake, Log>, p: f32) {
        g.tracker_mut().unwrap().progress = p;
    }

    #[test]
    fn starts_idle_with_stages_hidden() {
        let g = game(3);
        assert_eq!(g.state(), GameState::Idle);
        assert_eq!(g.hooks().hides, 1);
    }

    #[test]
    fn bind_resets_tracker_and_tracks() {
        let mut g = game(3);
        g.bind(Fake { progress: 42.0, resets: 0 });
        assert_eq!(g.state(), GameState::Tracking);
        assert_eq!(g.tracker().unwrap().progress, 0.0);
        assert_eq!(g.tracker().unwrap().resets, 1);
    }

    #[test]
    fn rate_is_zero_for_non_positive_dt() {
        let mut g = game(3);
        g.bind(Fake::default());
        set(&mut g, 10.0);
        g.tick(0.0);
        assert_eq!(g.rate(), 0.0);
        set(&mut g, 20.0);
        g.tick(-0.1);
        assert_eq!(g.rate(), 0.0);
        set(&mut g, 25.0);
        g.tick(0.5);
        assert!((g.rate() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn finalize_ramp_covers_last_ten_percent() {
        let mut g = game(3);
        g.bind(Fake::default());
        for (p, want) in [(50.0, 0.0), (90.0, 0.0), (95.0, 0.5), (99.0, 0.9)] {
            set(&mut g, p);
            g.tick(0.016);
            assert!((g.hooks().finalize - want).abs() < 1e-4, "progress {p}");
        }
    }

    #[test]
    fn completion_fires_once_and_resets_unit() {
        let mut g = game(3);
        g.bind(Fake::default());
        set(&mut g, 100.0);
        g.tick(0.016);
        assert_eq!(g.hooks().completions, vec![1]);
        assert_eq!(g.hooks().stages, vec![0]);
        assert_eq!(g.state(), GameState::Tracking);
        assert_eq!(g.tracker().unwrap().progress, 0.0);
        assert_eq!(g.current_progress(), 0.0);
        assert_eq!(g.animated_rate(), 0.0);
        assert_eq!(g.indicator().x, -5.0);
        g.tick(0.016);
        assert_eq!(g.hooks().completions, vec![1]);
    }

    #[test]
    fn final_snowball_ends_the_episode_once() {
        let mut g = game(3);
        g.bind(Fake::default());
        for _ in 0..3 {
            for p in [40.0, 80.0, 100.0] {
                set(&mut g, p);
                g.tick(0.016);
            }
        }
        assert_eq!(g.state(), GameState::EpisodeDone);
        assert_eq!(g.completed_count(), 3);
        assert_eq!(g.hooks().completions, vec![1, 2, 3]);
        assert_eq!(g.hooks().stages, vec![0, 1, 2]);
        assert_eq!(g.hooks().scenes, vec!["ResultScene".to_string()]);
        assert_eq!(g.tracker().unwrap().progress, 0.0);

        set(&mut g, 100.0);
        for _ in 0..5 {
            g.tick(0.016);
        }
        assert_eq!(g.hooks().completions.len(), 3);
        assert_eq!(g.hooks().scenes.len(), 1);
    }

    #[test]
    fn restart_begins_a_new_run() {
        let mut g = game(1);
        g.bind(Fake::default());
        set(&mut g, 100.0);
        g.tick(0.016);
        assert_eq!(g.state(), GameState::EpisodeDone);
        g.restart();
        assert_eq!(g.state(), GameState::Tracking);
        assert_eq!(g.completed_count(), 0);
        assert_eq!(g.hooks().hides, 2);
        set(&mut g, 100.0);
        g.tick(0.016);
        assert_eq!(g.hooks().completions, vec![1, 1]);
    }

    #[test]
    fn rebinding_after_a_finished_run_starts_from_zero() {
        let mut g = game(1);
        g.bind(Fake::default());
        set(&mut g, 100.0);
        g.tick(0.016);
        g.unbind();
        assert_eq!(g.state(), GameState::Idle);
        assert_eq!(g.completed_count(), 1);
        g.bind(Fake::default());
        assert_eq!(g.completed_count(), 0);
        assert_eq!(g.state(), GameState::Tracking);
    }

    #[test]
    fn unbind_decays_instead_of_snapping() {
        let mut g = game(3);
        g.bind(Fake::default());
        for i in 1..=10 {
            set(&mut g, i as f32 * 5.0);
            g.tick(0.1);
        }
        let before = g.animated_rate();
        assert!(before > 0.0);
        assert!(g.unbind().is_some());
        g.tick(0.05);
        let after = g.animated_rate();
        assert!(after > 0.0 && after < before);
        assert_eq!(g.hooks().finalize, 0.0);
        for _ in 0..200 {
            g.tick(0.05);
        }
        assert!(g.animated_rate().abs() < 1e-3);
        assert!(g.unbind().is_none());
    }

    #[test]
    fn cue_plays_once_per_rising_stretch() {
        let mut g = game(3);
        g.bind(Fake::default());
        let mut p = 0.0;
        for _ in 0..20 {
            p += 1.0;
            set(&mut g, p);
            g.tick(0.1);
        }
        assert_eq!(g.hooks().cues, 1);
        // Stall until the smoothed rate drops, then move again.
        for _ in 0..100 {
            g.tick(0.1);
        }
        assert!(g.animated_rate() < 0.5);
        for _ in 0..20 {
            p += 1.0;
            set(&mut g, p);
            g.tick(0.1);
        }
        assert_eq!(g.hooks().cues, 2);
    }

    #[test]
    fn cue_is_not_restarted_while_playing() {
        let mut g = game(3);
        g.hooks_mut().cue_playing = true;
        g.bind(Fake::default());
        for i in 1..=20 {
            set(&mut g, i as f32);
            g.tick(0.1);
        }
        assert_eq!(g.hooks().cues, 0);
        g.hooks_mut().cue_playing = false;
        set(&mut g, 21.0);
        g.tick(0.1);
        assert_eq!(g.hooks().cues, 1);
    }

    #[test]
    fn indicator_eases_and_flips_once() {
        let mut ind = Indicator::new(-5.0, 5.0);
        ind.step(50.0, 0.1, 3.0);
        assert!(ind.x > -5.0 && ind.x < 0.0);
        for _ in 0..200 {
            ind.step(100.0, 0.1, 3.0);
        }
        assert!(ind.flipped);
        assert!(!ind.flip(), "second flip is a no-op");
        ind.step(100.0, 0.1, 3.0);
        assert!(ind.flipped);
        ind.reset();
        assert_eq!((ind.x, ind.flipped), (-5.0, false));
    }

    #[test]
    fn reset_current_keeps_count() {
        let mut g = game(3);
        g.bind(Fake::default());
        set(&mut g, 100.0);
        g.tick(0.016);
        set(&mut g, 60.0);
        g.tick(0.016);
        g.reset_current();
        assert_eq!(g.completed_count(), 1);
        assert_eq!(g.tracker().unwrap().progress, 0.0);
        assert_eq!(g.current_progress(), 0.0);
        assert_eq!(g.indicator().x, -5.0);
    }
}
