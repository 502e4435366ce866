//! Gesture properties checked through the controller.
//!
//! Each touch sequence must produce exactly one of: a swipe effect, a tap
//! effect, or nothing, and swipe-driven values must stay in range.

use std::time::Duration;

use reelplay_core::config::{MAX_BRIGHTNESS, MIN_BRIGHTNESS};
use reelplay_core::gesture::{GesturePhase, SurfaceRect, TouchPoint};
use reelplay_core::sim::{RecordingShell, SimulatedEngineFactory, SimulatedMedia};
use reelplay_core::{ManualClock, PlayerController, StreamSource};

const SURFACE: SurfaceRect = SurfaceRect {
    left: 0.0,
    top: 0.0,
    width: 640.0,
    height: 360.0,
};

fn mounted() -> (PlayerController, SimulatedMedia, ManualClock) {
    let media = SimulatedMedia::new().with_duration(600.0);
    let clock = ManualClock::new();
    let mut player = PlayerController::new(
        Box::new(media.sink()),
        Box::new(RecordingShell::new()),
        Box::new(SimulatedEngineFactory::new()),
        Box::new(clock.clone()),
    );
    player.load(StreamSource::new("https://cdn.example/clip.mp4"), None);
    for _ in 0..3 {
        clock.advance_ms(50);
        media.advance(Duration::from_millis(50));
        player.tick();
    }
    player.seek_to(300.0);
    player.tick();
    (player, media, clock)
}

/// Small deterministic generator so failures are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> f32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 33) as f32) / (u32::MAX >> 1) as f32
    }

    fn range(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.next()
    }
}

#[test]
fn test_swipe_and_tap_are_exclusive() {
    let mut rng = Lcg(7);
    for _ in 0..200 {
        let (mut player, media, clock) = mounted();
        let start = TouchPoint::new(rng.range(0.0, 640.0), rng.range(0.0, 360.0));
        let end = TouchPoint::new(
            start.x + rng.range(-60.0, 60.0),
            start.y + rng.range(-60.0, 60.0),
        );
        let volume_before = media.volume();
        let brightness_before = media.brightness();
        let paused_before = media.is_paused();
        let seeks_before = media.seeks().len();

        player.touch_start(start, SURFACE, false);
        let swiping = player.touch_move(end, SURFACE);
        player.touch_end();
        clock.advance_ms(400);
        player.tick();

        let swipe_effect = media.volume() != volume_before || media.brightness() != brightness_before;
        let tap_effect = media.is_paused() != paused_before || media.seeks().len() != seeks_before;
        assert!(!(swipe_effect && tap_effect), "start={start:?} end={end:?}");
        if swiping {
            assert!(!tap_effect);
        } else {
            assert!(tap_effect);
        }
        assert_eq!(player.gesture_phase(), GesturePhase::Idle);
    }
}

#[test]
fn test_swipe_values_stay_in_range() {
    let mut rng = Lcg(42);
    let (mut player, media, _clock) = mounted();
    for _ in 0..300 {
        let start = TouchPoint::new(rng.range(0.0, 640.0), rng.range(0.0, 360.0));
        player.touch_start(start, SURFACE, false);
        for _ in 0..5 {
            let p = TouchPoint::new(start.x + rng.range(-5.0, 5.0), rng.range(-800.0, 1200.0));
            player.touch_move(p, SURFACE);
            let volume = media.volume();
            assert!((0.0..=1.0).contains(&volume));
            assert!((MIN_BRIGHTNESS..=MAX_BRIGHTNESS).contains(&media.brightness()));
            let session = player.session().unwrap();
            assert_eq!(session.volume, volume);
            assert_eq!(session.muted, volume == 0.0 && media.is_muted());
        }
        player.touch_end();
        player.touch_cancel();
    }
}

#[test]
fn test_double_tap_seeks_once_without_toggle() {
    let (mut player, media, clock) = mounted();
    let right = TouchPoint::new(500.0, 180.0);
    player.touch_start(right, SURFACE, false);
    player.touch_end();
    clock.advance_ms(200);
    player.touch_start(right, SURFACE, false);
    player.touch_end();
    clock.advance_ms(1000);
    player.tick();

    assert_eq!(media.seeks(), vec![300.0, 305.0]);
    assert!(!media.is_paused());
}

#[test]
fn test_touch_on_controls_does_nothing() {
    let (mut player, media, clock) = mounted();
    player.touch_start(TouchPoint::new(20.0, 340.0), SURFACE, true);
    player.touch_move(TouchPoint::new(20.0, 100.0), SURFACE);
    player.touch_end();
    clock.advance_ms(1000);
    player.tick();
    assert!(!media.is_paused());
    assert_eq!(media.volume(), 1.0);
    assert_eq!(media.brightness(), 1.0);
}
