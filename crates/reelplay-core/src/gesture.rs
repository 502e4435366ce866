//! Touch gesture interpreter.
//!
//! Classifies touch sequences on the player surface into playback commands.
//!
//! ```text
//! Idle ──start──▶ Started ──vertical drag──▶ Swiping ──end──▶ Idle (discarded)
//!                    │
//!                    └──end──▶ TapPending ──window elapses──▶ Idle (toggle play)
//!                                   │
//!                                   └──second tap in window──▶ Idle (seek ±step)
//! ```
//!
//! A vertical swipe on the right half changes volume, on the left half the
//! brightness filter. The interpreter is driven entirely by timestamps passed
//! in by the caller, so it runs the same under a real or a manual clock.

use std::time::Duration;

use crate::config::{PlayerConfig, MAX_BRIGHTNESS, MIN_BRIGHTNESS};
use crate::timer::Deadline;

/// Half of the player surface a gesture started on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// A touch position in surface coordinates (pixels).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub x: f32,
    pub y: f32,
}

impl TouchPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Bounds of the player surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl SurfaceRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn side_of(&self, point: TouchPoint) -> Side {
        if point.x < self.left + self.width / 2.0 {
            Side::Left
        } else {
            Side::Right
        }
    }
}

/// Volume and brightness at the moment a touch started.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureBaselines {
    pub volume: f32,
    pub brightness: f32,
}

/// A command produced by a classified gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureCommand {
    TogglePlay,
    SeekBy { seconds: f64, side: Side },
    Volume { volume: f32, muted: bool },
    Brightness(f32),
}

/// Observable interpreter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Idle,
    Started,
    Swiping,
    TapPending,
}

#[derive(Debug, Clone, Copy)]
struct ActiveTouch {
    start: TouchPoint,
    side: Side,
    baselines: GestureBaselines,
    swiping: bool,
}

pub struct GestureInterpreter {
    double_tap_window: Duration,
    seek_step: f64,
    swipe_threshold: f32,
    touch: Option<ActiveTouch>,
    /// End time of the last tap that could still become a double tap
    last_tap_end: Option<Duration>,
    /// Deferred single-tap toggle
    pending_tap: Deadline,
}

impl GestureInterpreter {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            double_tap_window: config.double_tap_window,
            seek_step: config.seek_step_secs,
            swipe_threshold: config.swipe_threshold_px,
            touch: None,
            last_tap_end: None,
            pending_tap: Deadline::new(),
        }
    }

    pub fn phase(&self) -> GesturePhase {
        match self.touch {
            Some(ActiveTouch { swiping: true, .. }) => GesturePhase::Swiping,
            Some(_) => GesturePhase::Started,
            None if self.pending_tap.is_armed() => GesturePhase::TapPending,
            None => GesturePhase::Idle,
        }
    }

    /// Whether the current sequence is a swipe, i.e. default scrolling and
    /// tap handling must be suppressed.
    pub fn is_swiping(&self) -> bool {
        self.phase() == GesturePhase::Swiping
    }

    /// Starts a touch sequence. Touches on control buttons are ignored.
    ///
    /// Returns any deferred tap that came due before this touch.
    pub fn touch_start(
        &mut self,
        point: TouchPoint,
        surface: SurfaceRect,
        in_control: bool,
        baselines: GestureBaselines,
        now: Duration,
    ) -> Vec<GestureCommand> {
        let due = self.tick(now).into_iter().collect();
        if in_control {
            self.touch = None;
            return due;
        }
        self.touch = Some(ActiveTouch {
            start: point,
            side: surface.side_of(point),
            baselines,
            swiping: false,
        });
        due
    }

    /// Updates the sequence with a new touch position.
    pub fn touch_move(&mut self, point: TouchPoint, surface: SurfaceRect) -> Option<GestureCommand> {
        let threshold = self.swipe_threshold;
        let touch = self.touch.as_mut()?;
        let delta_y = touch.start.y - point.y;
        let delta_x = point.x - touch.start.x;

        if !touch.swiping {
            if delta_y.abs() < threshold || delta_y.abs() <= delta_x.abs() {
                return None;
            }
            touch.swiping = true;
            tracing::debug!("Vertical swipe on {:?} half", touch.side);
        }

        if surface.height <= 0.0 {
            return None;
        }
        let delta = delta_y / surface.height;
        Some(match touch.side {
            Side::Right => {
                let volume = (touch.baselines.volume + delta).clamp(0.0, 1.0);
                GestureCommand::Volume {
                    volume,
                    muted: volume == 0.0,
                }
            }
            Side::Left => GestureCommand::Brightness(
                (touch.baselines.brightness + delta).clamp(MIN_BRIGHTNESS, MAX_BRIGHTNESS),
            ),
        })
    }

    /// Ends the sequence, classifying it as a swipe (discarded) or a tap.
    pub fn touch_end(&mut self, now: Duration) -> Vec<GestureCommand> {
        let mut commands: Vec<_> = self.tick(now).into_iter().collect();
        let Some(touch) = self.touch.take() else {
            return commands;
        };
        if touch.swiping {
            return commands;
        }

        let is_double = matches!(
            self.last_tap_end,
            Some(last) if now.saturating_sub(last) < self.double_tap_window
        ) && self.pending_tap.is_armed();

        if is_double {
            self.pending_tap.cancel();
            self.last_tap_end = None;
            let seconds = match touch.side {
                Side::Left => -self.seek_step,
                Side::Right => self.seek_step,
            };
            tracing::debug!("Double tap on {:?} half, seeking {seconds:+}s", touch.side);
            commands.push(GestureCommand::SeekBy {
                seconds,
                side: touch.side,
            });
        } else {
            self.last_tap_end = Some(now);
            self.pending_tap.arm(now, self.double_tap_window);
        }
        commands
    }

    /// Drops the active touch without classifying it (touchcancel).
    pub fn touch_cancel(&mut self) {
        self.touch = None;
    }

    /// Fires the deferred single tap once the double-tap window elapsed.
    pub fn tick(&mut self, now: Duration) -> Option<GestureCommand> {
        if self.pending_tap.fire(now) {
            self.last_tap_end = None;
            Some(GestureCommand::TogglePlay)
        } else {
            None
        }
    }

    /// Clears the active touch and any pending tap.
    pub fn reset(&mut self) {
        self.touch = None;
        self.last_tap_end = None;
        self.pending_tap.cancel();
    }

    pub fn next_wake(&self, now: Duration) -> Option<Duration> {
        self.pending_tap.remaining(now)
    }
}
