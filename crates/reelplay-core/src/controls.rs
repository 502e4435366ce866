//! Transport control surface logic.
//!
//! UI-independent pieces of the control overlay:
//! - [`SeekBar`]: hover/drag scrub preview and commit
//! - [`AutoHide`]: idle timer that hides the overlay while playing
//! - [`QualityMenu`]: open/close state of the quality picker
//! - [`Shortcut`]: keyboard mapping
//! - [`enter_fullscreen`] / [`exit_fullscreen`] / [`toggle_picture_in_picture`]:
//!   best-effort platform orchestration

use std::time::Duration;

use crate::config::PlayerConfig;
use crate::media::PlatformShell;
use crate::timer::Deadline;

/// Formats seconds as `MM:SS`, or `H:MM:SS` from one hour on.
pub fn format_time(secs: f64) -> String {
    let total = if secs.is_finite() && secs > 0.0 {
        secs.floor() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let mins = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{hours}:{mins:02}:{secs:02}")
    } else {
        format!("{mins:02}:{secs:02}")
    }
}

/// Scrub preview shown above the seek bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekPreview {
    /// Target position in seconds
    pub time: f64,
    /// Horizontal position on the bar, 0.0 to 1.0
    pub ratio: f32,
}

impl SeekPreview {
    fn new(ratio: f32, duration: f64) -> Option<Self> {
        (duration.is_finite() && duration > 0.0).then(|| Self {
            time: f64::from(ratio) * duration,
            ratio,
        })
    }
}

/// Seek bar interaction state.
///
/// Desktop: hover previews, click commits. Touch: drag previews, release
/// commits. Nothing here touches the media sink; committed positions are
/// returned to the caller.
#[derive(Debug, Clone, Default)]
pub struct SeekBar {
    preview: Option<SeekPreview>,
    dragging: bool,
}

impl SeekBar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Horizontal ratio of `x` over a bar starting at `left`, clamped to 0..=1.
    pub fn ratio_at(x: f32, left: f32, width: f32) -> f32 {
        if width <= 0.0 {
            return 0.0;
        }
        ((x - left) / width).clamp(0.0, 1.0)
    }

    pub fn preview(&self) -> Option<SeekPreview> {
        self.preview
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Fill ratio to draw: the preview while scrubbing, playback progress otherwise.
    pub fn display_ratio(&self, progress: f32) -> f32 {
        self.preview.map_or(progress, |p| p.ratio)
    }

    pub fn hover(&mut self, ratio: f32, duration: f64) {
        if let Some(preview) = SeekPreview::new(ratio, duration) {
            self.preview = Some(preview);
        }
    }

    pub fn leave(&mut self) {
        if !self.dragging {
            self.preview = None;
        }
    }

    /// Desktop click: commits immediately.
    pub fn click(&mut self, ratio: f32, duration: f64) -> Option<f64> {
        SeekPreview::new(ratio, duration).map(|p| p.time)
    }

    pub fn drag_start(&mut self, ratio: f32, duration: f64) {
        if let Some(preview) = SeekPreview::new(ratio, duration) {
            self.dragging = true;
            self.preview = Some(preview);
        }
    }

    pub fn drag_move(&mut self, ratio: f32, duration: f64) {
        if self.dragging {
            self.hover(ratio, duration);
        }
    }

    /// Touch release: commits the previewed position.
    pub fn drag_end(&mut self) -> Option<f64> {
        if !std::mem::replace(&mut self.dragging, false) {
            return None;
        }
        self.preview.take().map(|p| p.time)
    }

    pub fn cancel(&mut self) {
        self.dragging = false;
        self.preview = None;
    }
}

/// Hides the control overlay after a period without interaction.
///
/// While paused the overlay stays visible and the timer is suspended.
#[derive(Debug, Clone)]
pub struct AutoHide {
    visible: bool,
    playing: bool,
    delay: Duration,
    deadline: Deadline,
}

impl AutoHide {
    pub fn new(delay: Duration) -> Self {
        Self {
            visible: true,
            playing: false,
            delay,
            deadline: Deadline::new(),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Any pointer movement or control interaction.
    pub fn poke(&mut self, now: Duration) {
        self.visible = true;
        if self.playing {
            self.deadline.arm(now, self.delay);
        }
    }

    pub fn set_playing(&mut self, playing: bool, now: Duration) {
        if playing == self.playing {
            return;
        }
        self.playing = playing;
        if playing {
            self.deadline.arm(now, self.delay);
        } else {
            self.deadline.cancel();
            self.visible = true;
        }
    }

    /// Returns true when the overlay was hidden by this call.
    pub fn tick(&mut self, now: Duration) -> bool {
        if self.deadline.fire(now) {
            self.visible = false;
            true
        } else {
            false
        }
    }

    pub fn next_wake(&self, now: Duration) -> Option<Duration> {
        self.deadline.remaining(now)
    }
}

/// Open state of the quality picker.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityMenu {
    open: bool,
}

impl QualityMenu {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn toggle(&mut self) {
        self.open = !self.open;
    }

    pub fn close(&mut self) {
        self.open = false;
    }
}

/// Keys the player reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    K,
    M,
    F,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Escape,
}

impl Key {
    /// Maps a DOM `KeyboardEvent.key` value.
    pub fn from_dom(key: &str) -> Option<Self> {
        Some(match key {
            " " | "Spacebar" => Key::Space,
            "k" | "K" => Key::K,
            "m" | "M" => Key::M,
            "f" | "F" => Key::F,
            "ArrowLeft" => Key::ArrowLeft,
            "ArrowRight" => Key::ArrowRight,
            "ArrowUp" => Key::ArrowUp,
            "ArrowDown" => Key::ArrowDown,
            "Escape" | "Esc" => Key::Escape,
            _ => return None,
        })
    }
}

/// Playback command bound to a key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shortcut {
    TogglePlay,
    SeekBy(f64),
    VolumeBy(f32),
    ToggleMute,
    ToggleFullscreen,
}

impl Shortcut {
    pub fn for_key(key: Key, config: &PlayerConfig) -> Option<Self> {
        match key {
            Key::Space | Key::K => Some(Shortcut::TogglePlay),
            Key::ArrowLeft => Some(Shortcut::SeekBy(-config.keyboard_seek_secs)),
            Key::ArrowRight => Some(Shortcut::SeekBy(config.keyboard_seek_secs)),
            Key::ArrowUp => Some(Shortcut::VolumeBy(config.keyboard_volume_step)),
            Key::ArrowDown => Some(Shortcut::VolumeBy(-config.keyboard_volume_step)),
            Key::M => Some(Shortcut::ToggleMute),
            Key::F => Some(Shortcut::ToggleFullscreen),
            Key::Escape => None,
        }
    }
}

/// Which fullscreen path was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullscreenMode {
    /// The whole player container (controls included)
    Container,
    /// The platform's native element fullscreen
    Element,
}

/// Enters fullscreen, preferring the player container and falling back to
/// element fullscreen. Orientation lock is attempted but never required.
pub fn enter_fullscreen(shell: &mut dyn PlatformShell) -> Option<FullscreenMode> {
    let container = shell.supports_container_fullscreen()
        && match shell.request_container_fullscreen() {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("Container fullscreen refused, trying element: {e}");
                false
            }
        };

    let mode = if container {
        FullscreenMode::Container
    } else {
        match shell.request_element_fullscreen() {
            Ok(()) => FullscreenMode::Element,
            Err(e) => {
                tracing::warn!("Fullscreen unavailable: {e}");
                return None;
            }
        }
    };

    if let Err(e) = shell.lock_landscape() {
        tracing::debug!("Orientation lock skipped: {e}");
    }
    tracing::info!("Entered {mode:?} fullscreen");
    Some(mode)
}

/// Leaves fullscreen and releases the orientation lock. Returns false if the
/// platform refused to exit.
pub fn exit_fullscreen(shell: &mut dyn PlatformShell) -> bool {
    let exited = match shell.exit_fullscreen() {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Exit fullscreen failed: {e}");
            false
        }
    };
    if let Err(e) = shell.unlock_orientation() {
        tracing::debug!("Orientation unlock skipped: {e}");
    }
    exited
}

/// Toggles picture-in-picture and returns the resulting state. Unsupported
/// platforms leave the state unchanged.
pub fn toggle_picture_in_picture(shell: &mut dyn PlatformShell, active: bool) -> bool {
    let result = if active {
        shell.exit_picture_in_picture()
    } else {
        shell.request_picture_in_picture()
    };
    match result {
        Ok(()) => !active,
        Err(e) => {
            tracing::debug!("Picture-in-picture unavailable: {e}");
            active
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::HeadlessShell;
    use crate::sim::RecordingShell;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "00:00");
        assert_eq!(format_time(65.9), "01:05");
        assert_eq!(format_time(3661.0), "1:01:01");
        assert_eq!(format_time(f64::NAN), "00:00");
    }

    #[test]
    fn test_ratio_is_clamped() {
        assert_eq!(SeekBar::ratio_at(50.0, 0.0, 200.0), 0.25);
        assert_eq!(SeekBar::ratio_at(-10.0, 0.0, 200.0), 0.0);
        assert_eq!(SeekBar::ratio_at(500.0, 0.0, 200.0), 1.0);
        assert_eq!(SeekBar::ratio_at(10.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_hover_previews_without_commit() {
        let mut bar = SeekBar::new();
        bar.hover(0.5, 1200.0);
        assert_eq!(
            bar.preview(),
            Some(SeekPreview {
                time: 600.0,
                ratio: 0.5,
            })
        );
        assert_eq!(bar.display_ratio(0.1), 0.5);
        bar.leave();
        assert_eq!(bar.preview(), None);
        assert_eq!(bar.display_ratio(0.1), 0.1);
    }

    #[test]
    fn test_click_commits_ratio_times_duration() {
        let mut bar = SeekBar::new();
        assert_eq!(bar.click(0.25, 1200.0), Some(300.0));
        assert_eq!(bar.click(0.25, 0.0), None);
    }

    #[test]
    fn test_drag_commits_on_release() {
        let mut bar = SeekBar::new();
        bar.drag_start(0.1, 1000.0);
        bar.drag_move(0.75, 1000.0);
        bar.leave();
        assert!(bar.preview().is_some());
        assert_eq!(bar.drag_end(), Some(750.0));
        assert_eq!(bar.preview(), None);
        assert_eq!(bar.drag_end(), None);
    }

    #[test]
    fn test_drag_without_duration_is_ignored() {
        let mut bar = SeekBar::new();
        bar.drag_start(0.5, 0.0);
        assert!(!bar.is_dragging());
        assert_eq!(bar.drag_end(), None);
    }

    #[test]
    fn test_auto_hide_only_while_playing() {
        let mut hide = AutoHide::new(ms(3000));
        hide.poke(ms(0));
        assert!(!hide.tick(ms(10_000)));
        assert!(hide.is_visible());

        hide.set_playing(true, ms(10_000));
        assert!(!hide.tick(ms(12_999)));
        assert!(hide.tick(ms(13_000)));
        assert!(!hide.is_visible());
    }

    #[test]
    fn test_auto_hide_reset_by_interaction() {
        let mut hide = AutoHide::new(ms(3000));
        hide.set_playing(true, ms(0));
        hide.poke(ms(2500));
        assert!(!hide.tick(ms(3000)));
        assert!(hide.tick(ms(5500)));
        hide.poke(ms(6000));
        assert!(hide.is_visible());
    }

    #[test]
    fn test_pause_shows_and_suspends() {
        let mut hide = AutoHide::new(ms(3000));
        hide.set_playing(true, ms(0));
        hide.tick(ms(3000));
        hide.set_playing(false, ms(4000));
        assert!(hide.is_visible());
        assert_eq!(hide.next_wake(ms(4000)), None);
    }

    #[test]
    fn test_shortcuts() {
        let config = PlayerConfig::default();
        assert_eq!(Shortcut::for_key(Key::K, &config), Some(Shortcut::TogglePlay));
        assert_eq!(
            Shortcut::for_key(Key::ArrowLeft, &config),
            Some(Shortcut::SeekBy(-10.0))
        );
        assert_eq!(
            Shortcut::for_key(Key::ArrowDown, &config),
            Some(Shortcut::VolumeBy(-0.1))
        );
        assert_eq!(Shortcut::for_key(Key::Escape, &config), None);
        assert_eq!(Key::from_dom(" "), Some(Key::Space));
        assert_eq!(Key::from_dom("Enter"), None);
    }

    #[test]
    fn test_fullscreen_prefers_container() {
        let mut shell = RecordingShell::new();
        assert_eq!(enter_fullscreen(&mut shell), Some(FullscreenMode::Container));
        assert_eq!(
            shell.calls(),
            vec!["request_container_fullscreen", "lock_landscape"]
        );
    }

    #[test]
    fn test_fullscreen_falls_back_to_element() {
        let mut shell = RecordingShell::new()
            .element_fullscreen_only()
            .without_orientation_lock();
        assert_eq!(enter_fullscreen(&mut shell), Some(FullscreenMode::Element));
        assert!(exit_fullscreen(&mut shell));
        assert_eq!(
            shell.calls(),
            vec![
                "request_element_fullscreen",
                "lock_landscape",
                "exit_fullscreen",
                "unlock_orientation",
            ]
        );
    }

    #[test]
    fn test_unsupported_features_are_no_ops() {
        let mut shell = HeadlessShell;
        assert_eq!(enter_fullscreen(&mut shell), None);
        assert!(!toggle_picture_in_picture(&mut shell, false));
    }

    #[test]
    fn test_picture_in_picture_toggles() {
        let mut shell = RecordingShell::new();
        assert!(toggle_picture_in_picture(&mut shell, false));
        assert!(!toggle_picture_in_picture(&mut shell, true));
        let mut unsupported = RecordingShell::new().without_picture_in_picture();
        assert!(!toggle_picture_in_picture(&mut unsupported, false));
    }
}
