//! Player controller.
//!
//! [`PlayerController`] is the long-lived object behind one mounted player.
//! It owns the media sink, the stream loader, the playback tracker, the
//! gesture interpreter and every control-surface timer, and it is driven by
//! the host in two ways:
//!
//! - commands (`toggle_play`, `seek_to`, `touch_start`, `handle_key`, ...)
//!   issued from input handlers
//! - [`PlayerController::tick`], called once per frame (or when
//!   [`PlayerController::next_wake`] elapses), which drains sink, engine and
//!   platform events and fires due timers
//!
//! # Lifecycle
//!
//! ```text
//! new()                       → no source
//! load(source, resume?)       → tears down the previous source (final
//!                               progress snapshot, engine destroyed), then
//!                               attaches the new one
//! unmount() / drop            → final snapshot, engine destroyed, timers cleared
//! ```
//!
//! Nothing here returns an error to the host except quality selection;
//! platform failures are logged and ignored.

use std::time::Duration;

use crate::clock::Clock;
use crate::config::{PlayerConfig, ResumePolicy, MAX_BRIGHTNESS, MIN_BRIGHTNESS};
use crate::controls::{
    self, AutoHide, FullscreenMode, Key, QualityMenu, SeekBar, SeekPreview, Shortcut,
};
use crate::error::{LoaderError, PlayRejection, PlayerError};
use crate::gesture::{
    GestureBaselines, GestureCommand, GestureInterpreter, GesturePhase, Side, SurfaceRect,
    TouchPoint,
};
use crate::loader::{EngineFactory, LoaderAction, StreamLoader, Transport};
use crate::media::{MediaEvent, MediaSink, PlatformEvent, PlatformShell};
use crate::session::{PlaybackPhase, PlaybackSession, ProgressSnapshot, ResumeHint, StreamSource};
use crate::timer::{earliest, Transient};
use crate::tracker::{PlaybackTracker, TrackerAction};

/// Receives progress snapshots for persistence.
pub type ProgressCallback = Box<dyn FnMut(ProgressSnapshot)>;

/// Double-tap seek feedback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekIndicator {
    pub side: Side,
    pub seconds: f64,
}

/// Swipe feedback showing the live value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureIndicator {
    Volume(f32),
    Brightness(f32),
}

pub struct PlayerController {
    config: PlayerConfig,
    resume_policy: ResumePolicy,
    clock: Box<dyn Clock>,
    sink: Box<dyn MediaSink>,
    shell: Box<dyn PlatformShell>,
    engines: Box<dyn EngineFactory>,
    /// Current source, `None` before the first load and after unmount
    source: Option<StreamSource>,
    loader: Option<StreamLoader>,
    tracker: Option<PlaybackTracker>,
    gestures: GestureInterpreter,
    seek_bar: SeekBar,
    auto_hide: AutoHide,
    quality_menu: QualityMenu,
    seek_indicator: Transient<SeekIndicator>,
    gesture_indicator: Transient<GestureIndicator>,
    fullscreen_mode: Option<FullscreenMode>,
    /// Carried across sources, like the element's own volume
    brightness: f32,
    /// The user muted explicitly; automatic starts keep the mute
    user_muted: bool,
    /// An automatic start is in flight and may still be refused
    autoplay_pending: bool,
    on_progress: Option<ProgressCallback>,
}

impl PlayerController {
    pub fn new(
        sink: Box<dyn MediaSink>,
        shell: Box<dyn PlatformShell>,
        engines: Box<dyn EngineFactory>,
        clock: Box<dyn Clock>,
    ) -> Self {
        let config = PlayerConfig::default();
        Self {
            gestures: GestureInterpreter::new(&config),
            auto_hide: AutoHide::new(config.controls_hide_delay),
            seek_indicator: Transient::new(config.seek_indicator_ttl),
            gesture_indicator: Transient::new(config.gesture_indicator_ttl),
            config,
            resume_policy: ResumePolicy::default(),
            clock,
            sink,
            shell,
            engines,
            source: None,
            loader: None,
            tracker: None,
            seek_bar: SeekBar::new(),
            quality_menu: QualityMenu::default(),
            fullscreen_mode: None,
            brightness: 1.0,
            user_muted: false,
            autoplay_pending: false,
            on_progress: None,
        }
    }

    pub fn with_config(mut self, config: PlayerConfig) -> Self {
        self.gestures = GestureInterpreter::new(&config);
        self.auto_hide = AutoHide::new(config.controls_hide_delay);
        self.seek_indicator = Transient::new(config.seek_indicator_ttl);
        self.gesture_indicator = Transient::new(config.gesture_indicator_ttl);
        self.config = config;
        self
    }

    pub fn with_resume_policy(mut self, policy: ResumePolicy) -> Self {
        self.resume_policy = policy;
        self
    }

    /// Sets the callback receiving progress snapshots.
    pub fn with_progress_callback(mut self, callback: impl FnMut(ProgressSnapshot) + 'static) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    // ─── Source lifecycle ───────────────────────────────────────

    /// Attaches a new source, tearing down the previous one first.
    ///
    /// The resume hint is applied once, on the first "ready" of this source,
    /// if it passes the resume policy.
    pub fn load(&mut self, source: StreamSource, resume: Option<ResumeHint>) {
        let now = self.clock.now();
        let previous = self.release_source();

        let resume_at = resume.and_then(|hint| {
            let position = self
                .resume_policy
                .resume_position(hint.current_time, hint.duration);
            if position.is_none() {
                tracing::debug!(
                    "Resume hint {:.1}/{:.1} outside resume window, starting over",
                    hint.current_time,
                    hint.duration
                );
            }
            position
        });

        let mut tracker = PlaybackTracker::new(&source.url, resume_at, self.config.progress_interval);
        {
            let session = tracker.session_mut();
            session.volume = self.sink.volume();
            session.muted = self.sink.is_muted();
            session.brightness = self.brightness;
            if let Some(previous) = previous {
                session.fullscreen = previous.fullscreen;
                session.picture_in_picture = previous.picture_in_picture;
            }
        }
        self.tracker = Some(tracker);

        let (loader, actions) =
            StreamLoader::attach(&source.url, self.sink.as_mut(), self.engines.as_ref(), &self.config);
        tracing::info!("Loaded {} ({:?})", source.url, loader.transport());
        self.loader = Some(loader);
        self.source = Some(source);

        self.handle_loader_actions(actions);
        self.auto_hide.poke(now);
    }

    /// Releases the current source: final progress snapshot, engine
    /// destroyed, timers cleared. Safe to call more than once.
    pub fn unmount(&mut self) {
        if self.release_source().is_some() {
            tracing::info!("Player unmounted");
        }
    }

    /// Emits the current position through the progress callback without
    /// releasing anything. Hosts call this when the page is hidden or about
    /// to be discarded, where teardown may never run.
    pub fn snapshot_progress(&mut self) {
        let position = self.sink.position();
        let Some(tracker) = self.tracker.as_mut() else {
            return;
        };
        tracker.session_mut().set_current_time(position);
        if let Some(snapshot) = tracker.session().snapshot() {
            self.emit_progress(snapshot);
        }
    }

    fn release_source(&mut self) -> Option<PlaybackSession> {
        self.gestures.reset();
        self.seek_bar.cancel();
        self.quality_menu.close();
        self.seek_indicator.clear();
        self.gesture_indicator.clear();
        self.autoplay_pending = false;

        let mut tracker = self.tracker.take()?;
        let position = self.sink.position();
        tracker.session_mut().set_current_time(position);
        if let Some(snapshot) = tracker.teardown() {
            self.emit_progress(snapshot);
        }
        if let Some(mut loader) = self.loader.take() {
            loader.release();
        }
        self.sink.clear_source();
        self.source = None;
        Some(tracker.session().clone())
    }

    // ─── Event pump ─────────────────────────────────────────────

    /// Drains pending events and fires due timers. Call once per frame.
    pub fn tick(&mut self) {
        let now = self.clock.now();

        for event in self.sink.poll_events() {
            self.handle_media_event(event, now);
        }

        let actions = self.loader.as_mut().map(StreamLoader::poll).unwrap_or_default();
        self.handle_loader_actions(actions);

        for event in self.shell.poll_events() {
            self.handle_platform_event(event);
        }

        if let Some(command) = self.gestures.tick(now) {
            self.apply_gesture(command, now);
        }
        self.auto_hide.tick(now);
        self.seek_indicator.tick(now);
        self.gesture_indicator.tick(now);
    }

    /// Time until the next timer fires, for hosts that sleep between frames.
    pub fn next_wake(&self) -> Option<Duration> {
        let now = self.clock.now();
        earliest([
            self.gestures.next_wake(now),
            self.auto_hide.next_wake(now),
            self.seek_indicator.remaining(now),
            self.gesture_indicator.remaining(now),
        ])
    }

    fn handle_media_event(&mut self, event: MediaEvent, now: Duration) {
        let mut loader_actions = Vec::new();
        match &event {
            MediaEvent::Ready => {
                if let Some(loader) = self.loader.as_mut() {
                    loader.mark_healthy();
                }
            }
            MediaEvent::Play => self.autoplay_pending = false,
            MediaEvent::PlayRejected(reason) => self.on_play_rejected(reason),
            MediaEvent::Error(message) => {
                if let Some(loader) = self.loader.as_mut() {
                    loader_actions.extend(loader.on_media_error(message, self.sink.as_mut()));
                }
            }
            _ => {}
        }

        let actions = match self.tracker.as_mut() {
            Some(tracker) => tracker.observe(&event, now),
            None => Vec::new(),
        };
        for action in actions {
            match action {
                TrackerAction::Persist(snapshot) => self.emit_progress(snapshot),
                TrackerAction::SeekTo(position) => self.sink.seek(position),
            }
        }
        self.handle_loader_actions(loader_actions);

        let playing = self.session().is_some_and(|s| s.playing);
        self.auto_hide.set_playing(playing, now);
    }

    fn handle_loader_actions(&mut self, actions: Vec<LoaderAction>) {
        for action in actions {
            match action {
                LoaderAction::StartPlayback => {
                    if let (Some(loader), Some(tracker)) = (self.loader.as_ref(), self.tracker.as_mut()) {
                        let session = tracker.session_mut();
                        session.quality_levels = loader.available_qualities().to_vec();
                        session.active_level = loader.active_level();
                    }
                    self.start_playback();
                }
                LoaderAction::Reloaded => {
                    if let Some(tracker) = self.tracker.as_mut() {
                        tracker.prepare_reload();
                    }
                    self.start_playback();
                }
                LoaderAction::Unavailable(reason) => {
                    if let Some(tracker) = self.tracker.as_mut() {
                        tracker.mark_unavailable(reason);
                    }
                    self.autoplay_pending = false;
                    self.auto_hide.set_playing(false, self.clock.now());
                }
            }
        }
    }

    fn handle_platform_event(&mut self, event: PlatformEvent) {
        match event {
            PlatformEvent::FullscreenChanged(active) => {
                if !active && self.fullscreen_mode.take().is_some() {
                    // Left through the platform (Esc, back gesture).
                    if let Err(e) = self.shell.unlock_orientation() {
                        tracing::debug!("Orientation unlock skipped: {e}");
                    }
                }
                if let Some(session) = self.session_mut() {
                    session.fullscreen = active;
                }
            }
            PlatformEvent::PictureInPictureChanged(active) => {
                if let Some(session) = self.session_mut() {
                    session.picture_in_picture = active;
                }
            }
        }
    }

    fn emit_progress(&mut self, snapshot: ProgressSnapshot) {
        if let Some(callback) = self.on_progress.as_mut() {
            callback(snapshot);
        }
    }

    // ─── Autoplay ───────────────────────────────────────────────

    /// Starts playback unmuted, falling back to muted playback when the
    /// platform refuses unmuted autoplay.
    fn start_playback(&mut self) {
        self.autoplay_pending = true;
        if !self.user_muted && self.sink.is_muted() {
            self.sink.set_muted(false);
        }
        match self.sink.play() {
            Ok(()) => {}
            Err(reason) => self.on_play_rejected(&reason),
        }
    }

    fn on_play_rejected(&mut self, reason: &PlayRejection) {
        if !self.autoplay_pending {
            tracing::debug!("Play request refused: {reason}");
            return;
        }
        match reason {
            PlayRejection::NotAllowed if !self.sink.is_muted() => {
                tracing::debug!("Unmuted autoplay refused, retrying muted");
                self.sink.set_muted(true);
                if let Some(session) = self.session_mut() {
                    session.muted = true;
                }
                if let Err(reason) = self.sink.play() {
                    tracing::debug!("Muted autoplay refused too: {reason}");
                    self.autoplay_pending = false;
                }
            }
            _ => {
                tracing::debug!("Autoplay abandoned, waiting for user: {reason}");
                self.autoplay_pending = false;
            }
        }
    }

    // ─── Playback commands ──────────────────────────────────────

    fn is_playable(&self) -> bool {
        self.session()
            .is_some_and(|s| !matches!(s.phase, PlaybackPhase::Unavailable { .. }))
    }

    pub fn toggle_play(&mut self) {
        if self.sink.is_paused() {
            self.play();
        } else {
            self.pause();
        }
    }

    pub fn play(&mut self) {
        if !self.is_playable() {
            return;
        }
        if let Err(reason) = self.sink.play() {
            tracing::debug!("Play request refused: {reason}");
        }
        self.poke();
    }

    pub fn pause(&mut self) {
        if self.tracker.is_none() {
            return;
        }
        self.sink.pause();
        self.poke();
    }

    /// Seeks to `position` seconds, clamped to the media.
    pub fn seek_to(&mut self, position: f64) {
        let Some(tracker) = self.tracker.as_mut() else {
            return;
        };
        let session = tracker.session_mut();
        let position = session.clamp_position(position);
        session.set_current_time(position);
        self.sink.seek(position);
        tracing::debug!("Seek to {position:.1}s");
        self.poke();
    }

    pub fn seek_by(&mut self, delta: f64) {
        let position = self.sink.position() + delta;
        self.seek_to(position);
    }

    /// Volume slider: 0 mutes, anything else unmutes.
    pub fn set_volume(&mut self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        self.apply_volume(volume, volume == 0.0);
        self.poke();
    }

    /// Keyboard volume step. Leaves the mute state alone.
    pub fn adjust_volume(&mut self, delta: f32) {
        let volume = (self.sink.volume() + delta).clamp(0.0, 1.0);
        self.sink.set_volume(volume);
        if let Some(session) = self.session_mut() {
            session.volume = volume;
        }
        self.poke();
    }

    pub fn toggle_mute(&mut self) {
        let muted = !self.sink.is_muted();
        self.sink.set_muted(muted);
        self.user_muted = muted;
        if let Some(session) = self.session_mut() {
            session.muted = muted;
        }
        self.poke();
    }

    fn apply_volume(&mut self, volume: f32, muted: bool) {
        self.sink.set_volume(volume);
        self.sink.set_muted(muted);
        self.user_muted = muted;
        if let Some(session) = self.session_mut() {
            session.volume = volume;
            session.muted = muted;
        }
    }

    /// Sets the visual brightness filter, clamped to 0.2..=2.0.
    pub fn set_brightness(&mut self, factor: f32) {
        let factor = factor.clamp(MIN_BRIGHTNESS, MAX_BRIGHTNESS);
        self.brightness = factor;
        self.sink.set_brightness(factor);
        if let Some(session) = self.session_mut() {
            session.brightness = factor;
        }
    }

    /// Pins a quality level, or [`AUTO_LEVEL`](crate::session::AUTO_LEVEL)
    /// for automatic selection.
    pub fn select_quality(&mut self, level: i32) -> Result<(), PlayerError> {
        let loader = self.loader.as_mut().ok_or(LoaderError::NoAdaptiveEngine)?;
        loader.set_quality(level)?;
        if let Some(session) = self.session_mut() {
            session.active_level = level;
        }
        self.quality_menu.close();
        self.poke();
        Ok(())
    }

    pub fn toggle_fullscreen(&mut self) {
        let fullscreen = self.session().is_some_and(|s| s.fullscreen);
        if fullscreen {
            if controls::exit_fullscreen(self.shell.as_mut()) {
                self.fullscreen_mode = None;
                if let Some(session) = self.session_mut() {
                    session.fullscreen = false;
                }
            }
        } else if let Some(mode) = controls::enter_fullscreen(self.shell.as_mut()) {
            self.fullscreen_mode = Some(mode);
            if let Some(session) = self.session_mut() {
                session.fullscreen = true;
            }
        }
        self.poke();
    }

    pub fn toggle_picture_in_picture(&mut self) {
        let active = self.session().is_some_and(|s| s.picture_in_picture);
        let active = controls::toggle_picture_in_picture(self.shell.as_mut(), active);
        if let Some(session) = self.session_mut() {
            session.picture_in_picture = active;
        }
        self.poke();
    }

    // ─── Input ──────────────────────────────────────────────────

    /// Handles a keyboard shortcut. Returns true if the key was consumed.
    pub fn handle_key(&mut self, key: Key) -> bool {
        let Some(shortcut) = Shortcut::for_key(key, &self.config) else {
            return false;
        };
        if self.tracker.is_none() {
            return false;
        }
        match shortcut {
            Shortcut::TogglePlay => self.toggle_play(),
            Shortcut::SeekBy(delta) => self.seek_by(delta),
            Shortcut::VolumeBy(delta) => self.adjust_volume(delta),
            Shortcut::ToggleMute => self.toggle_mute(),
            Shortcut::ToggleFullscreen => self.toggle_fullscreen(),
        }
        self.poke();
        true
    }

    /// Pointer movement over the player: shows the controls.
    pub fn pointer_moved(&mut self) {
        self.poke();
    }

    /// Desktop click on the video area: toggles immediately, no double-click seek.
    pub fn click_surface(&mut self) {
        self.toggle_play();
    }

    pub fn touch_start(&mut self, point: TouchPoint, surface: SurfaceRect, in_control: bool) {
        let now = self.clock.now();
        let baselines = GestureBaselines {
            volume: self.sink.volume(),
            brightness: self.brightness,
        };
        for command in self
            .gestures
            .touch_start(point, surface, in_control, baselines, now)
        {
            self.apply_gesture(command, now);
        }
        self.auto_hide.poke(now);
    }

    /// Returns true while the sequence is a swipe; the host must then
    /// suppress scrolling.
    pub fn touch_move(&mut self, point: TouchPoint, surface: SurfaceRect) -> bool {
        let now = self.clock.now();
        if let Some(command) = self.gestures.touch_move(point, surface) {
            self.apply_gesture(command, now);
        }
        self.gestures.is_swiping()
    }

    pub fn touch_end(&mut self) {
        let now = self.clock.now();
        for command in self.gestures.touch_end(now) {
            self.apply_gesture(command, now);
        }
    }

    pub fn touch_cancel(&mut self) {
        self.gestures.touch_cancel();
    }

    fn apply_gesture(&mut self, command: GestureCommand, now: Duration) {
        match command {
            GestureCommand::TogglePlay => self.toggle_play(),
            GestureCommand::SeekBy { seconds, side } => {
                self.seek_by(seconds);
                self.seek_indicator.show(SeekIndicator { side, seconds }, now);
            }
            GestureCommand::Volume { volume, muted } => {
                self.apply_volume(volume, muted);
                self.gesture_indicator
                    .show(GestureIndicator::Volume(volume), now);
            }
            GestureCommand::Brightness(factor) => {
                self.set_brightness(factor);
                self.gesture_indicator
                    .show(GestureIndicator::Brightness(factor), now);
            }
        }
    }

    // ─── Seek bar ───────────────────────────────────────────────

    fn duration(&self) -> f64 {
        self.session().map_or(0.0, |s| s.duration)
    }

    pub fn seek_hover(&mut self, ratio: f32) {
        let duration = self.duration();
        self.seek_bar.hover(ratio, duration);
    }

    pub fn seek_leave(&mut self) {
        self.seek_bar.leave();
    }

    pub fn seek_click(&mut self, ratio: f32) {
        let duration = self.duration();
        if let Some(position) = self.seek_bar.click(ratio, duration) {
            self.seek_to(position);
        }
    }

    pub fn seek_drag_start(&mut self, ratio: f32) {
        let duration = self.duration();
        self.seek_bar.drag_start(ratio, duration);
        self.poke();
    }

    pub fn seek_drag_move(&mut self, ratio: f32) {
        let duration = self.duration();
        self.seek_bar.drag_move(ratio, duration);
    }

    pub fn seek_drag_end(&mut self) {
        if let Some(position) = self.seek_bar.drag_end() {
            self.seek_to(position);
        }
    }

    // ─── Quality menu ───────────────────────────────────────────

    pub fn toggle_quality_menu(&mut self) {
        self.quality_menu.toggle();
        self.poke();
    }

    pub fn close_quality_menu(&mut self) {
        self.quality_menu.close();
    }

    pub fn quality_menu_open(&self) -> bool {
        self.quality_menu.is_open()
    }

    // ─── Accessors ──────────────────────────────────────────────

    pub fn source(&self) -> Option<&StreamSource> {
        self.source.as_ref()
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.tracker.as_ref().map(PlaybackTracker::session)
    }

    fn session_mut(&mut self) -> Option<&mut PlaybackSession> {
        self.tracker.as_mut().map(PlaybackTracker::session_mut)
    }

    pub fn transport(&self) -> Option<Transport> {
        self.loader.as_ref().map(StreamLoader::transport)
    }

    pub fn is_loading(&self) -> bool {
        self.session().is_some_and(|s| s.phase.is_loading())
    }

    pub fn controls_visible(&self) -> bool {
        self.auto_hide.is_visible()
    }

    pub fn seek_preview(&self) -> Option<SeekPreview> {
        self.seek_bar.preview()
    }

    pub fn seek_bar(&self) -> &SeekBar {
        &self.seek_bar
    }

    pub fn seek_indicator(&self) -> Option<&SeekIndicator> {
        self.seek_indicator.get()
    }

    pub fn gesture_indicator(&self) -> Option<&GestureIndicator> {
        self.gesture_indicator.get()
    }

    pub fn gesture_phase(&self) -> GesturePhase {
        self.gestures.phase()
    }

    pub fn fullscreen_mode(&self) -> Option<FullscreenMode> {
        self.fullscreen_mode
    }

    fn poke(&mut self) {
        let now = self.clock.now();
        self.auto_hide.poke(now);
    }
}

impl Drop for PlayerController {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::loader::{EngineErrorKind, EngineEvent, LevelInfo};
    use crate::media::HeadlessShell;
    use crate::session::AUTO_LEVEL;
    use crate::sim::{AutoplayPolicy, RecordingShell, SimulatedEngineFactory, SimulatedMedia};
    use std::cell::RefCell;
    use std::rc::Rc;

    const SURFACE: SurfaceRect = SurfaceRect {
        left: 0.0,
        top: 0.0,
        width: 400.0,
        height: 200.0,
    };

    struct Harness {
        player: PlayerController,
        media: SimulatedMedia,
        clock: ManualClock,
        shell: RecordingShell,
        engines: SimulatedEngineFactory,
        progress: Rc<RefCell<Vec<ProgressSnapshot>>>,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_media(SimulatedMedia::new().with_duration(1200.0))
        }

        fn with_media(media: SimulatedMedia) -> Self {
            let clock = ManualClock::new();
            let shell = RecordingShell::new();
            let engines = SimulatedEngineFactory::new()
                .with_media(&media)
                .with_ladder(vec![
                    LevelInfo {
                        height: Some(720),
                        bitrate: 2_000_000,
                    },
                    LevelInfo {
                        height: Some(1080),
                        bitrate: 5_000_000,
                    },
                ]);
            let progress = Rc::new(RefCell::new(Vec::new()));
            let sink = Rc::clone(&progress);
            let player = PlayerController::new(
                Box::new(media.sink()),
                Box::new(shell.clone()),
                Box::new(engines.clone()),
                Box::new(clock.clone()),
            )
            .with_progress_callback(move |s| sink.borrow_mut().push(s));
            Self {
                player,
                media,
                clock,
                shell,
                engines,
                progress,
            }
        }

        /// Advances media and clock together and pumps the controller.
        fn run(&mut self, ms: u64) {
            let step = 50;
            let mut elapsed = 0;
            while elapsed < ms {
                let dt = step.min(ms - elapsed);
                self.clock.advance_ms(dt);
                self.media.advance(Duration::from_millis(dt));
                self.player.tick();
                elapsed += dt;
            }
        }

        fn load_direct(&mut self) {
            self.player
                .load(StreamSource::new("https://cdn.example/movie-a/ep-1.mp4"), None);
            self.run(100);
        }
    }

    #[test]
    fn test_direct_source_autoplays() {
        let mut h = Harness::new();
        h.load_direct();
        let session = h.player.session().unwrap();
        assert!(session.playing);
        assert_eq!(session.phase, PlaybackPhase::Ready);
        assert_eq!(session.duration, 1200.0);
        assert_eq!(h.player.transport(), Some(Transport::Direct));
        assert!(!h.media.is_muted());
    }

    #[test]
    fn test_autoplay_falls_back_to_muted() {
        let media = SimulatedMedia::new().with_duration(1200.0);
        media.set_autoplay_policy(AutoplayPolicy::RequireMuted);
        let mut h = Harness::with_media(media);
        h.load_direct();
        assert!(h.media.is_muted());
        assert!(h.player.session().unwrap().muted);
        assert!(h.player.session().unwrap().playing);
    }

    #[test]
    fn test_async_autoplay_rejection_falls_back_to_muted() {
        let media = SimulatedMedia::new()
            .with_duration(1200.0)
            .with_async_rejection(true);
        media.set_autoplay_policy(AutoplayPolicy::RequireMuted);
        let mut h = Harness::with_media(media);
        h.load_direct();
        assert!(h.media.is_muted());
        assert!(h.player.session().unwrap().playing);
    }

    #[test]
    fn test_user_play_rejection_does_not_mute() {
        let mut h = Harness::new();
        h.load_direct();
        h.player.pause();
        h.media.set_autoplay_policy(AutoplayPolicy::RequireMuted);
        h.player.play();
        h.run(100);
        assert!(!h.media.is_muted());
        assert!(!h.player.session().unwrap().playing);
    }

    #[test]
    fn test_adaptive_source_exposes_qualities() {
        let mut h = Harness::new();
        h.player
            .load(StreamSource::new("https://cdn.example/movie-a/index.m3u8"), None);
        h.run(100);
        let session = h.player.session().unwrap();
        let labels: Vec<_> = session.quality_levels.iter().map(|q| q.label.as_str()).collect();
        assert_eq!(labels, vec!["Automatic", "720p", "1080p"]);
        assert!(session.playing);

        h.player.select_quality(1).unwrap();
        assert_eq!(h.player.session().unwrap().active_level, 1);
        assert_eq!(h.engines.engine().current_level(), 1);
        h.player.select_quality(AUTO_LEVEL).unwrap();
        assert_eq!(h.player.session().unwrap().active_level, AUTO_LEVEL);
        assert!(h.player.select_quality(7).is_err());
    }

    #[test]
    fn test_quality_selection_on_direct_source_fails() {
        let mut h = Harness::new();
        h.load_direct();
        assert!(matches!(
            h.player.select_quality(0),
            Err(PlayerError::Loader(LoaderError::NoAdaptiveEngine))
        ));
    }

    #[test]
    fn test_switching_source_destroys_previous_engine() {
        let mut h = Harness::new();
        h.player
            .load(StreamSource::new("https://cdn.example/movie-a/ep-1.m3u8"), None);
        h.run(100);
        h.player
            .load(StreamSource::new("https://cdn.example/movie-a/ep-2.m3u8"), None);
        h.run(100);

        let engines = h.engines.engines();
        assert_eq!(engines.len(), 2);
        assert!(engines[0].is_destroyed());
        assert!(!engines[1].is_destroyed());
        assert_eq!(h.media.max_attached_engines(), 1);
    }

    #[test]
    fn test_exhausted_recovery_marks_unavailable() {
        let mut h = Harness::new();
        h.player
            .load(StreamSource::new("https://cdn.example/movie-a/ep-1.m3u8"), None);
        h.run(100);
        let fatal = || EngineEvent::Error {
            kind: EngineErrorKind::Network,
            fatal: true,
            details: "levelLoadError".into(),
        };
        h.engines.engine().emit(fatal());
        h.run(50);
        assert_eq!(h.engines.engine().start_load_calls(), 1);
        assert_eq!(h.player.session().unwrap().phase, PlaybackPhase::Ready);

        h.engines.engine().emit(fatal());
        h.run(50);
        assert!(matches!(
            h.player.session().unwrap().phase,
            PlaybackPhase::Unavailable { .. }
        ));
        assert!(h.player.controls_visible());
    }

    #[test]
    fn test_volume_slider_and_keyboard() {
        let mut h = Harness::new();
        h.load_direct();
        h.player.set_volume(0.0);
        assert!(h.media.is_muted());
        h.player.set_volume(0.4);
        assert!(!h.media.is_muted());

        h.player.handle_key(Key::ArrowUp);
        assert!((h.media.volume() - 0.5).abs() < 1e-6);
        for _ in 0..10 {
            h.player.handle_key(Key::ArrowUp);
        }
        assert_eq!(h.media.volume(), 1.0);
        for _ in 0..15 {
            h.player.handle_key(Key::ArrowDown);
        }
        assert_eq!(h.media.volume(), 0.0);
        assert!(!h.media.is_muted());

        h.player.handle_key(Key::M);
        assert!(h.media.is_muted());
    }

    #[test]
    fn test_keyboard_seek_clamps() {
        let mut h = Harness::new();
        h.load_direct();
        h.player.handle_key(Key::ArrowLeft);
        assert_eq!(h.media.position(), 0.0);
        h.player.seek_to(1195.0);
        h.player.handle_key(Key::ArrowRight);
        assert_eq!(h.media.position(), 1200.0);
    }

    #[test]
    fn test_space_toggles_play() {
        let mut h = Harness::new();
        h.load_direct();
        assert!(h.player.handle_key(Key::Space));
        h.run(50);
        assert!(!h.player.session().unwrap().playing);
        assert!(h.player.handle_key(Key::K));
        h.run(50);
        assert!(h.player.session().unwrap().playing);
        assert!(!h.player.handle_key(Key::Escape));
    }

    #[test]
    fn test_controls_hide_while_playing() {
        let mut h = Harness::new();
        h.load_direct();
        assert!(h.player.controls_visible());
        h.run(3000);
        assert!(!h.player.controls_visible());
        h.player.pointer_moved();
        assert!(h.player.controls_visible());
        h.player.pause();
        h.run(10_000);
        assert!(h.player.controls_visible());
    }

    #[test]
    fn test_double_tap_seeks_with_indicator() {
        let mut h = Harness::new();
        h.load_direct();
        h.player.seek_to(100.0);
        let right = TouchPoint::new(350.0, 100.0);
        for _ in 0..2 {
            h.player.touch_start(right, SURFACE, false);
            h.clock.advance_ms(30);
            h.player.touch_end();
            h.clock.advance_ms(100);
        }
        assert_eq!(
            h.player.seek_indicator(),
            Some(&SeekIndicator {
                side: Side::Right,
                seconds: 5.0,
            })
        );
        assert_eq!(h.media.seeks().last(), Some(&105.0));
        h.clock.advance_ms(1000);
        h.player.tick();
        assert!(h.player.session().unwrap().playing);
        assert_eq!(h.player.seek_indicator(), None);
    }

    #[test]
    fn test_single_tap_toggles_after_window() {
        let mut h = Harness::new();
        h.load_direct();
        h.player.touch_start(TouchPoint::new(50.0, 100.0), SURFACE, false);
        h.player.touch_end();
        h.player.tick();
        assert!(!h.media.is_paused());
        assert!(h.player.next_wake().is_some());
        h.clock.advance_ms(300);
        h.player.tick();
        assert!(h.media.is_paused());
    }

    #[test]
    fn test_swipe_left_changes_brightness() {
        let mut h = Harness::new();
        h.load_direct();
        h.player.touch_start(TouchPoint::new(50.0, 150.0), SURFACE, false);
        assert!(h.player.touch_move(TouchPoint::new(50.0, 50.0), SURFACE));
        h.player.touch_end();
        assert!((h.media.brightness() - 1.5).abs() < 1e-6);
        assert_eq!(
            h.player.gesture_indicator(),
            Some(&GestureIndicator::Brightness(h.media.brightness()))
        );
        h.clock.advance_ms(800);
        h.player.tick();
        assert_eq!(h.player.gesture_indicator(), None);
        assert!(!h.media.is_paused());
    }

    #[test]
    fn test_seek_bar_hover_then_click() {
        let mut h = Harness::new();
        h.load_direct();
        h.player.seek_hover(0.5);
        assert_eq!(h.player.seek_preview().map(|p| p.time), Some(600.0));
        assert!(h.media.seeks().is_empty());
        h.player.seek_click(0.5);
        assert_eq!(h.media.seeks(), vec![600.0]);
    }

    #[test]
    fn test_seek_bar_touch_drag_commits_on_release() {
        let mut h = Harness::new();
        h.load_direct();
        h.player.seek_drag_start(0.1);
        h.player.seek_drag_move(0.25);
        assert!(h.media.seeks().is_empty());
        h.player.seek_drag_end();
        assert_eq!(h.media.seeks(), vec![300.0]);
    }

    #[test]
    fn test_fullscreen_round_trip() {
        let mut h = Harness::new();
        h.load_direct();
        h.player.toggle_fullscreen();
        assert!(h.player.session().unwrap().fullscreen);
        assert_eq!(h.player.fullscreen_mode(), Some(FullscreenMode::Container));

        h.shell.emit(PlatformEvent::FullscreenChanged(false));
        h.player.tick();
        assert!(!h.player.session().unwrap().fullscreen);
        assert_eq!(h.shell.calls().last(), Some(&"unlock_orientation"));
    }

    #[test]
    fn test_features_unsupported_never_fail() {
        let media = SimulatedMedia::new();
        let mut player = PlayerController::new(
            Box::new(media.sink()),
            Box::new(HeadlessShell),
            Box::new(SimulatedEngineFactory::new()),
            Box::new(ManualClock::new()),
        );
        player.load(StreamSource::new("clip.mp4"), None);
        player.toggle_fullscreen();
        player.toggle_picture_in_picture();
        let session = player.session().unwrap();
        assert!(!session.fullscreen);
        assert!(!session.picture_in_picture);
    }

    #[test]
    fn test_unmount_emits_final_snapshot_and_clears() {
        let mut h = Harness::new();
        h.load_direct();
        h.media.set_position(42.0);
        h.player.unmount();
        assert_eq!(
            h.progress.borrow().last(),
            Some(&ProgressSnapshot {
                current_time: 42.0,
                duration: 1200.0,
            })
        );
        assert!(h.player.session().is_none());
        assert_eq!(h.media.source(), None);
        let count = h.progress.borrow().len();
        h.player.unmount();
        assert_eq!(h.progress.borrow().len(), count);
    }

    #[test]
    fn test_resume_hint_outside_window_is_ignored() {
        let mut h = Harness::new();
        h.player.load(
            StreamSource::new("https://cdn.example/movie-a/ep-1.mp4"),
            Some(ResumeHint::new(1190.0, 1200.0)),
        );
        h.run(100);
        assert!(h.media.seeks().is_empty());
    }
}
