// What you SEE:
// • The camera image of the floor; your shadow gets a yellow crosshair.
// • Move around: the progress bar fills and the marker slides right.
// • Each full bar lights one snowball dot; after the last one the result screen shows.
// • M toggles the shadow-mask view, R restarts the current snowball,
//   T detaches/re-attaches the tracker, ENTER plays again from the result screen. ESC quits.

use anyhow::Context as _;
use clap::Parser;
use minifb::Key;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{Level, debug, info};

use snowball_shadow::config::Config;
use snowball_shadow::draw::{
    Drawer, blit_frame, blit_mask, draw_crosshair, draw_indicator, draw_progress_bar,
    draw_text_5x7, fill_rect, stroke_rect, text_width,
};
use snowball_shadow::game::{GameHooks, GameState, ProgressionController};
use snowball_shadow::synthetic::SyntheticSource;
use snowball_shadow::tracker::ShadowTracker;
use snowball_shadow::types::Canvas;

// How long the on-screen "audio" cue stays lit, in seconds.
const CUE_SECONDS: f32 = 0.6;

#[derive(Parser, Debug)]
#[command(name = "snowball-shadow", version, about)]
struct Args {
    /// JSON config file; missing fields use defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Camera device index.
    #[arg(long)]
    device: Option<u32>,

    /// Requested capture width (advisory).
    #[arg(long)]
    width: Option<u32>,

    /// Requested capture height (advisory).
    #[arg(long)]
    height: Option<u32>,

    /// Luminance below which a pixel is shadow.
    #[arg(long)]
    threshold: Option<u8>,

    /// Smallest shadow area (px^2) that counts.
    #[arg(long)]
    min_area: Option<f64>,

    /// Shadow travel (px) per snowball.
    #[arg(long)]
    target_distance: Option<f64>,

    /// Snowballs to make before the result scene.
    #[arg(long)]
    snowballs: Option<u32>,

    /// Use a generated moving shadow instead of the camera.
    #[arg(long)]
    synthetic: bool,

    /// More logging (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn into_config(self) -> anyhow::Result<(Config, bool)> {
        let mut cfg = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => Config::default(),
        };
        if let Some(v) = self.device {
            cfg.camera.device_index = v;
        }
        if let Some(v) = self.width {
            cfg.camera.width = v;
        }
        if let Some(v) = self.height {
            cfg.camera.height = v;
        }
        if let Some(v) = self.threshold {
            cfg.tracking.threshold = v;
        }
        if let Some(v) = self.min_area {
            cfg.tracking.min_area = v;
        }
        if let Some(v) = self.target_distance {
            cfg.tracking.target_distance = v;
        }
        if let Some(v) = self.snowballs {
            cfg.game.total_snowballs = v;
        }
        cfg.validate().context("invalid configuration")?;
        Ok((cfg, self.synthetic))
    }
}

/// Everything the controller wants to show or play ends up here and is drawn each frame.
#[derive(Default)]
struct ScreenHooks {
    rate: f32,
    finalize: f32,
    cue_left: f32,
    stages_lit: usize,
    scene_request: Option<String>,
}

impl ScreenHooks {
    fn advance(&mut self, dt: f32) {
        self.cue_left = (self.cue_left - dt).max(0.0);
    }
}

impl GameHooks for ScreenHooks {
    fn set_rate_param(&mut self, rate: f32) {
        self.rate = rate;
    }
    fn set_finalize_param(&mut self, value: f32) {
        self.finalize = value;
    }
    fn is_cue_playing(&self) -> bool {
        self.cue_left > 0.0
    }
    fn play_progress_cue(&mut self) {
        self.cue_left = CUE_SECONDS;
    }
    fn show_stage(&mut self, index: usize) {
        self.stages_lit = index + 1;
    }
    fn hide_all_stages(&mut self) {
        self.stages_lit = 0;
    }
    fn episode_complete(&mut self, scene: &str) {
        self.scene_request = Some(scene.to_string());
    }
}

enum View {
    Creation,
    Result(String),
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let level = match args.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let (cfg, synthetic) = args.into_config()?;
    let (w, h) = (cfg.camera.width as usize, cfg.camera.height as usize);

    /* --- Tracker: camera, or the generated shadow ---
       A missing camera is not fatal: the HUD says NO CAMERA and progress stays put. */
    let tracker = if synthetic {
        let src = SyntheticSource::orbit(cfg.camera.width, cfg.camera.height, cfg.camera.pixel_layout);
        ShadowTracker::with_source(src, &cfg.tracking)
    } else {
        ShadowTracker::open_camera(&cfg.camera, &cfg.tracking)
    };

    let mut game = ProgressionController::new(cfg.game.clone(), ScreenHooks::default());
    game.bind(tracker);
    let mut parked: Option<ShadowTracker> = None; // tracker while detached
    let mut view = View::Creation;
    let mut show_mask = false;

    let mut drawer = Drawer::new("Snowball Shadow", w, h)?;
    let mut canvas = Canvas::new(w, h);

    let mut last_fps_time = Instant::now();
    let mut frames_this_second: u32 = 0;
    let mut last_frame_time = Instant::now();

    /* ------------------------------ Main loop ------------------------------ */
    while drawer.is_open() && !drawer.esc_pressed() {
        let now = Instant::now();
        let dt = (now - last_frame_time).as_secs_f32();
        last_frame_time = now;

        /* 1) Inputs */
        if drawer.pressed_once(Key::M) {
            show_mask = !show_mask;
        }
        if drawer.pressed_once(Key::R) {
            game.reset_current();
        }
        if matches!(view, View::Creation) && drawer.pressed_once(Key::T) {
            // Stands in for the creation scene unloading / loading again.
            match game.unbind() {
                Some(t) => parked = Some(t),
                None => {
                    if let Some(t) = parked.take() {
                        game.bind(t);
                    }
                }
            }
        }
        if matches!(view, View::Result(_)) && drawer.pressed_once(Key::Enter) {
            if let Some(t) = parked.take() {
                game.bind(t);
            }
            view = View::Creation;
        }

        /* 2) Shadow pipeline, then game logic (explicit dt). */
        if let Some(t) = game.tracker_mut() {
            t.process_tick();
        }
        game.tick(dt);
        game.hooks_mut().advance(dt);

        /* 3) Scene change requested by the last snowball. */
        if let Some(scene) = game.hooks_mut().scene_request.take() {
            parked = game.unbind();
            info!(%scene, "switching scene");
            view = View::Result(scene);
        }

        /* 4) Draw */
        match &view {
            View::Creation => draw_creation(&mut canvas, &game, show_mask),
            View::Result(scene) => draw_result(&mut canvas, scene, &game),
        }
        drawer.present(&canvas)?;

        /* 5) FPS (debug log once per second) */
        frames_this_second += 1;
        if now.duration_since(last_fps_time) >= Duration::from_secs(1) {
            let secs = now.duration_since(last_fps_time).as_secs_f32();
            debug!("FPS: {:.1}", frames_this_second as f32 / secs);
            frames_this_second = 0;
            last_fps_time = now;
        }
    }

    if let Some(mut t) = game.unbind() {
        t.close();
    }
    if let Some(mut t) = parked.take() {
        t.close();
    }
    Ok(())
}

fn draw_creation(
    canvas: &mut Canvas,
    game: &ProgressionController<ShadowTracker, ScreenHooks>,
    show_mask: bool,
) {
    let hooks = game.hooks();
    let (cw, ch) = (canvas.width as i32, canvas.height as i32);

    /* Base image: live frame or mask; dark gray when there is nothing. */
    let tracker = game.tracker();
    match tracker {
        Some(t) if show_mask => blit_mask(canvas, t.mask(), 0x00_E0_E0_FF),
        Some(t) => match t.last_frame() {
            Some(frame) => blit_frame(canvas, frame),
            None => canvas.fill(0x00_30_30_30),
        },
        None => canvas.fill(0x00_30_30_30),
    }

    /* Crosshair on the shadow centroid (frame coords scaled to canvas). */
    if let Some(t) = tracker {
        if let (Some((x, y)), Some(frame)) = (t.last_centroid(), t.last_frame()) {
            let sx = (x * canvas.width as f64 / frame.width as f64) as i32;
            let sy = (y * canvas.height as f64 / frame.height as f64) as i32;
            draw_crosshair(canvas, sx, sy, 12, 0x00_FF_CC_33);
        }
    }

    /* Progress bar with the indicator riding above it; glows while the cue is on. */
    let bar_x = 16;
    let bar_w = cw - 32;
    let bar_y = ch - 28;
    let fill = if hooks.is_cue_playing() { 0x00_FF_FF_FF } else { 0x00_88_CC_FF };
    draw_progress_bar(canvas, bar_x, bar_y, bar_w, 12, game.current_progress() / 100.0, fill);
    let ind = game.indicator();
    let ind_x = bar_x + (ind.normalized() * (bar_w - 1) as f32) as i32;
    draw_indicator(canvas, ind_x, bar_y - 9, ind.flipped, 0x00_FF_FF_FF);

    /* Finalize ramp: thin strip under the bar in the last 10%. */
    let strip = (bar_w as f32 * hooks.finalize) as i32;
    fill_rect(canvas, bar_x, bar_y + 14, strip, 3, 0x00_FF_88_44);

    /* Stage dots, one per snowball. */
    for i in 0..game.total_target() as i32 {
        let x = cw - 24 - i * 16;
        let lit = (game.total_target() as i32 - 1 - i) < hooks.stages_lit as i32;
        if lit {
            fill_rect(canvas, x, 8, 10, 10, 0x00_FF_FF_FF);
        }
        stroke_rect(canvas, x, 8, 10, 10, 0x00_FF_FF_FF);
    }

    /* HUD line */
    let status = match (tracker, game.state()) {
        (None, _) => "DETACHED",
        (Some(t), _) if t.is_inert() => "NO CAMERA",
        (Some(t), GameState::Tracking) if !t.track_state().initialized => "LOST",
        (Some(_), GameState::Tracking) => "TRACKING",
        (Some(_), _) => "IDLE",
    };
    let view = if show_mask { "MASK" } else { "LIVE" };
    let hud = format!(
        "{} | {} | PROGRESS {:.1}% | RATE {:.1} | SNOWBALLS {}/{}",
        status,
        view,
        game.current_progress(),
        hooks.rate,
        game.completed_count(),
        game.total_target()
    );
    draw_text_5x7(canvas, 8, 8, &hud, 0x00_FF_FF_FF);
}

fn draw_result(
    canvas: &mut Canvas,
    scene: &str,
    game: &ProgressionController<ShadowTracker, ScreenHooks>,
) {
    canvas.fill(0x00_10_18_30);
    let (cw, ch) = (canvas.width as i32, canvas.height as i32);
    let lines = [
        scene.to_string(),
        format!("SNOWMAN COMPLETE: {}/{}", game.completed_count(), game.total_target()),
        "PRESS ENTER TO PLAY AGAIN".to_string(),
    ];
    for (i, line) in lines.iter().enumerate() {
        let x = (cw - text_width(line)) / 2;
        let y = ch / 2 - 20 + i as i32 * 16;
        draw_text_5x7(canvas, x, y, line, 0x00_FF_FF_FF);
    }
}
