use snowball_shadow::config::TrackingConfig;
use snowball_shadow::contour::Observation;
use snowball_shadow::types::PixelLayout;
use snowball_shadow::{ShadowTracker, SyntheticSource, TickOutcome};

fn tracking(target_distance: f64) -> TrackingConfig {
    TrackingConfig { threshold: 30, min_area: 1000.0, target_distance }
}

#[test]
fn four_strides_fill_one_snowball() {
    let src = SyntheticSource::new(1300, 200, PixelLayout::Bgra)
        .push_disc(100.0, 100.0)
        .push_disc(200.0, 100.0)
        .push_disc(400.0, 100.0)
        .push_disc(700.0, 100.0)
        .push_disc(1100.0, 100.0);
    let mut t = ShadowTracker::with_source(src, &tracking(1000.0));

    assert!(matches!(t.process_tick(), TickOutcome::Tracked(Observation::Anchored { .. })));
    let mut strides = Vec::new();
    for _ in 0..4 {
        match t.process_tick() {
            TickOutcome::Tracked(Observation::Moved { distance, .. }) => strides.push(distance),
            other => panic!("unexpected {other:?}"),
        }
    }
    for (got, want) in strides.iter().zip([100.0, 200.0, 300.0, 400.0]) {
        assert!((got - want).abs() < 1e-6, "{got} vs {want}");
    }
    assert!((t.current_progress() - 100.0).abs() < 1e-3);
}

#[test]
fn lost_shadow_does_not_count_the_jump() {
    let src = SyntheticSource::new(1200, 200, PixelLayout::Rgba)
        .push_disc(100.0, 100.0)
        .push_disc(150.0, 100.0)
        .push_empty()
        .push_disc(1000.0, 100.0)
        .push_disc(1010.0, 100.0);
    let mut t = ShadowTracker::with_source(src, &tracking(1000.0));

    t.process_tick();
    t.process_tick();
    let before = t.accumulated_distance();
    assert!((before - 50.0).abs() < 1e-6);

    assert_eq!(t.process_tick(), TickOutcome::Tracked(Observation::Lost));
    assert!(!t.track_state().initialized);
    assert_eq!(t.last_centroid(), None);

    assert!(matches!(t.process_tick(), TickOutcome::Tracked(Observation::Anchored { .. })));
    assert_eq!(t.accumulated_distance(), before);

    t.process_tick();
    assert!((t.accumulated_distance() - 60.0).abs() < 1e-6);
}

#[test]
fn small_blobs_are_ignored() {
    // r = 10 gives roughly 314 px^2, under the 1000 px^2 floor.
    let src = SyntheticSource::new(400, 200, PixelLayout::Bgra)
        .with_disc_radius(10.0)
        .push_disc(100.0, 100.0)
        .push_disc(300.0, 100.0);
    let mut t = ShadowTracker::with_source(src, &tracking(1000.0));
    assert_eq!(t.process_tick(), TickOutcome::Tracked(Observation::Lost));
    assert_eq!(t.process_tick(), TickOutcome::Tracked(Observation::Lost));
    assert_eq!(t.current_progress(), 0.0);
}

#[test]
fn camera_resolution_change_mid_stream() {
    let src = SyntheticSource::new(640, 480, PixelLayout::Bgra)
        .push_disc(200.0, 200.0)
        .push_disc(260.0, 200.0)
        .resize(320, 240)
        .push_disc(100.0, 100.0)
        .push_disc(140.0, 100.0);
    let mut t = ShadowTracker::with_source(src, &tracking(1000.0));

    t.process_tick();
    t.process_tick();
    assert!((t.accumulated_distance() - 60.0).abs() < 1e-6);

    assert!(matches!(t.process_tick(), TickOutcome::Tracked(Observation::Anchored { .. })));
    assert_eq!(t.mask().width, 320);
    assert_eq!(t.mask().height, 240);
    assert!((t.accumulated_distance() - 60.0).abs() < 1e-6);

    t.process_tick();
    assert!((t.accumulated_distance() - 100.0).abs() < 1e-6);
}

#[test]
fn progress_is_monotonic_and_bounded_over_a_long_walk() {
    let src = SyntheticSource::orbit(320, 240, PixelLayout::Bgra);
    let mut t = ShadowTracker::with_source(src, &tracking(500.0));
    let mut last = 0.0f32;
    let mut losses = 0;
    for _ in 0..400 {
        if t.process_tick() == TickOutcome::Tracked(Observation::Lost) {
            losses += 1;
        }
        let p = t.current_progress();
        assert!(p >= last, "progress went back: {p} < {last}");
        assert!((0.0..=100.0).contains(&p));
        last = p;
    }
    assert!(losses >= 4);
    assert_eq!(last, 100.0);
}

#[test]
fn missing_camera_keeps_everything_at_zero() {
    let mut t = ShadowTracker::new(None, &tracking(1000.0));
    for _ in 0..10 {
        assert_eq!(t.process_tick(), TickOutcome::Inert);
    }
    assert_eq!(t.current_progress(), 0.0);
    assert!(t.last_frame().is_none());
}
