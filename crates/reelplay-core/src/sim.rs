//! Deterministic stand-ins for platform bindings.
//!
//! [`SimulatedMedia`] behaves like a media element driven by explicit time
//! steps, [`SimulatedEngineFactory`] hands out adaptive engines whose events
//! are injected by the caller, and [`RecordingShell`] records platform calls.
//! All handles are cheap clones sharing state, so a test (or the demo) can
//! keep one handle while the controller owns another.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{HistoryError, PlatformError, PlayRejection};
use crate::loader::{AdaptiveEngine, EngineConfig, EngineEvent, EngineFactory, LevelInfo};
use crate::media::{MediaEvent, MediaSink, PlatformEvent, PlatformShell};
use crate::progress::{HistoryRequest, HistoryTransport};
use crate::session::AUTO_LEVEL;

/// How the simulated platform treats `play()` requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoplayPolicy {
    /// Every play request succeeds
    #[default]
    Allow,
    /// Unmuted playback is refused, muted playback is allowed
    RequireMuted,
    /// Every play request is refused
    Deny,
}

#[derive(Debug)]
struct MediaState {
    source: Option<String>,
    source_assignments: usize,
    attached_engines: usize,
    max_attached_engines: usize,
    native_manifest: bool,
    autoplay: AutoplayPolicy,
    reject_async: bool,
    paused: bool,
    ready: bool,
    load_latency: Duration,
    load_elapsed: Duration,
    media_duration: f64,
    position: f64,
    buffered_end: f64,
    volume: f32,
    muted: bool,
    brightness: f32,
    play_calls: usize,
    seeks: Vec<f64>,
    events: VecDeque<MediaEvent>,
}

impl Default for MediaState {
    fn default() -> Self {
        Self {
            source: None,
            source_assignments: 0,
            attached_engines: 0,
            max_attached_engines: 0,
            native_manifest: false,
            autoplay: AutoplayPolicy::Allow,
            reject_async: false,
            paused: true,
            ready: false,
            load_latency: Duration::ZERO,
            load_elapsed: Duration::ZERO,
            media_duration: 1200.0,
            position: 0.0,
            buffered_end: 0.0,
            volume: 1.0,
            muted: false,
            brightness: 1.0,
            play_calls: 0,
            seeks: Vec::new(),
            events: VecDeque::new(),
        }
    }
}

impl MediaState {
    fn reset_for_source(&mut self) {
        self.paused = true;
        self.ready = false;
        self.load_elapsed = Duration::ZERO;
        self.position = 0.0;
        self.buffered_end = 0.0;
        self.events.clear();
    }

    fn become_ready(&mut self) {
        if self.source.is_none() || self.ready {
            return;
        }
        self.ready = true;
        self.events.push_back(MediaEvent::DurationChange {
            duration: self.media_duration,
        });
        self.events.push_back(MediaEvent::Ready);
    }
}

/// A simulated media element.
#[derive(Debug, Clone, Default)]
pub struct SimulatedMedia {
    state: Arc<Mutex<MediaState>>,
}

impl SimulatedMedia {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the length of any media loaded into the element.
    pub fn with_duration(self, secs: f64) -> Self {
        self.state.lock().media_duration = secs;
        self
    }

    /// Delay between assigning a source and the element becoming ready.
    pub fn with_load_latency(self, latency: Duration) -> Self {
        self.state.lock().load_latency = latency;
        self
    }

    pub fn with_native_manifest(self, native: bool) -> Self {
        self.state.lock().native_manifest = native;
        self
    }

    /// Refuse play requests through events instead of return values.
    pub fn with_async_rejection(self, reject_async: bool) -> Self {
        self.state.lock().reject_async = reject_async;
        self
    }

    pub fn set_autoplay_policy(&self, policy: AutoplayPolicy) {
        self.state.lock().autoplay = policy;
    }

    /// A [`MediaSink`] view of this element.
    pub fn sink(&self) -> SimulatedSink {
        SimulatedSink {
            state: Arc::clone(&self.state),
        }
    }

    /// Advances playback by `dt`, emitting the events a real element would.
    pub fn advance(&self, dt: Duration) {
        let mut s = self.state.lock();
        if s.source.is_none() {
            return;
        }
        if !s.ready {
            s.load_elapsed += dt;
            if s.load_elapsed >= s.load_latency {
                s.become_ready();
            }
            return;
        }
        s.buffered_end = (s.position + 30.0).min(s.media_duration);
        let buffered_end = s.buffered_end;
        s.events.push_back(MediaEvent::Progress { buffered_end });
        if s.paused {
            return;
        }
        s.position = (s.position + dt.as_secs_f64()).min(s.media_duration);
        let position = s.position;
        s.events.push_back(MediaEvent::TimeUpdate { position });
        if position >= s.media_duration {
            s.paused = true;
            s.events.push_back(MediaEvent::Pause { position });
            s.events.push_back(MediaEvent::Ended);
        }
    }

    /// Marks the element ready immediately.
    pub fn make_ready(&self) {
        self.state.lock().become_ready();
    }

    /// Simulates a stall followed later by [`make_ready`](Self::make_ready)-style recovery.
    pub fn stall(&self) {
        self.state.lock().events.push_back(MediaEvent::Waiting);
    }

    /// Queues an arbitrary event.
    pub fn emit(&self, event: MediaEvent) {
        self.state.lock().events.push_back(event);
    }

    /// Moves the playhead without emitting events, as if time passed unobserved.
    pub fn set_position(&self, position: f64) {
        self.state.lock().position = position;
    }

    pub fn source(&self) -> Option<String> {
        self.state.lock().source.clone()
    }

    pub fn source_assignments(&self) -> usize {
        self.state.lock().source_assignments
    }

    pub fn attached_engines(&self) -> usize {
        self.state.lock().attached_engines
    }

    /// Highest number of engines that were ever attached at the same time.
    pub fn max_attached_engines(&self) -> usize {
        self.state.lock().max_attached_engines
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    pub fn position(&self) -> f64 {
        self.state.lock().position
    }

    pub fn volume(&self) -> f32 {
        self.state.lock().volume
    }

    pub fn is_muted(&self) -> bool {
        self.state.lock().muted
    }

    pub fn brightness(&self) -> f32 {
        self.state.lock().brightness
    }

    pub fn play_calls(&self) -> usize {
        self.state.lock().play_calls
    }

    /// Every seek target requested, in order.
    pub fn seeks(&self) -> Vec<f64> {
        self.state.lock().seeks.clone()
    }

    fn attach_engine(&self, url: &str) {
        let mut s = self.state.lock();
        s.attached_engines += 1;
        s.max_attached_engines = s.max_attached_engines.max(s.attached_engines);
        s.source = Some(url.to_string());
        s.reset_for_source();
    }

    fn detach_engine(&self) {
        let mut s = self.state.lock();
        s.attached_engines = s.attached_engines.saturating_sub(1);
    }
}

/// [`MediaSink`] implementation backed by a [`SimulatedMedia`].
#[derive(Debug, Clone)]
pub struct SimulatedSink {
    state: Arc<Mutex<MediaState>>,
}

impl MediaSink for SimulatedSink {
    fn set_source(&mut self, url: &str) {
        let mut s = self.state.lock();
        s.source = Some(url.to_string());
        s.source_assignments += 1;
        s.reset_for_source();
    }

    fn clear_source(&mut self) {
        let mut s = self.state.lock();
        s.source = None;
        s.reset_for_source();
    }

    fn supports_native_manifest(&self) -> bool {
        self.state.lock().native_manifest
    }

    fn play(&mut self) -> Result<(), PlayRejection> {
        let mut s = self.state.lock();
        s.play_calls += 1;
        if s.source.is_none() {
            return Err(PlayRejection::Other("no source".to_string()));
        }
        let refused = match s.autoplay {
            AutoplayPolicy::Allow => false,
            AutoplayPolicy::RequireMuted => !s.muted,
            AutoplayPolicy::Deny => true,
        };
        if refused {
            if s.reject_async {
                s.events
                    .push_back(MediaEvent::PlayRejected(PlayRejection::NotAllowed));
                return Ok(());
            }
            return Err(PlayRejection::NotAllowed);
        }
        if s.paused {
            s.paused = false;
            s.events.push_back(MediaEvent::Play);
        }
        Ok(())
    }

    fn pause(&mut self) {
        let mut s = self.state.lock();
        if !s.paused {
            s.paused = true;
            let position = s.position;
            s.events.push_back(MediaEvent::Pause { position });
        }
    }

    fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    fn seek(&mut self, position: f64) {
        let mut s = self.state.lock();
        let position = position.clamp(0.0, s.media_duration);
        s.seeks.push(position);
        s.position = position;
        s.events.push_back(MediaEvent::TimeUpdate { position });
    }

    fn position(&self) -> f64 {
        self.state.lock().position
    }

    fn duration(&self) -> Option<f64> {
        let s = self.state.lock();
        s.ready.then_some(s.media_duration)
    }

    fn set_volume(&mut self, volume: f32) {
        let mut s = self.state.lock();
        s.volume = volume.clamp(0.0, 1.0);
        let (volume, muted) = (s.volume, s.muted);
        s.events.push_back(MediaEvent::VolumeChange { volume, muted });
    }

    fn volume(&self) -> f32 {
        self.state.lock().volume
    }

    fn set_muted(&mut self, muted: bool) {
        let mut s = self.state.lock();
        s.muted = muted;
        let volume = s.volume;
        s.events.push_back(MediaEvent::VolumeChange { volume, muted });
    }

    fn is_muted(&self) -> bool {
        self.state.lock().muted
    }

    fn set_brightness(&mut self, factor: f32) {
        self.state.lock().brightness = factor;
    }

    fn poll_events(&mut self) -> Vec<MediaEvent> {
        self.state.lock().events.drain(..).collect()
    }
}

#[derive(Debug)]
struct EngineState {
    config: Option<EngineConfig>,
    url: Option<String>,
    level: i32,
    start_load_calls: usize,
    recover_calls: usize,
    destroy_calls: usize,
    destroyed: bool,
    events: VecDeque<EngineEvent>,
}

impl Default for EngineState {
    fn default() -> Self {
        Self {
            config: None,
            url: None,
            level: AUTO_LEVEL,
            start_load_calls: 0,
            recover_calls: 0,
            destroy_calls: 0,
            destroyed: false,
            events: VecDeque::new(),
        }
    }
}

/// Test-side handle to a simulated adaptive engine.
#[derive(Debug, Clone, Default)]
pub struct SimulatedEngineHandle {
    state: Arc<Mutex<EngineState>>,
}

impl SimulatedEngineHandle {
    /// Queues an engine event for the loader to pick up.
    pub fn emit(&self, event: EngineEvent) {
        self.state.lock().events.push_back(event);
    }

    pub fn url(&self) -> Option<String> {
        self.state.lock().url.clone()
    }

    pub fn config(&self) -> Option<EngineConfig> {
        self.state.lock().config
    }

    pub fn current_level(&self) -> i32 {
        self.state.lock().level
    }

    pub fn start_load_calls(&self) -> usize {
        self.state.lock().start_load_calls
    }

    pub fn recover_calls(&self) -> usize {
        self.state.lock().recover_calls
    }

    pub fn destroy_calls(&self) -> usize {
        self.state.lock().destroy_calls
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }
}

struct SimulatedEngine {
    handle: SimulatedEngineHandle,
    media: Option<SimulatedMedia>,
    ladder: Option<Vec<LevelInfo>>,
    attached: bool,
}

impl AdaptiveEngine for SimulatedEngine {
    fn load_source(&mut self, url: &str) {
        self.handle.state.lock().url = Some(url.to_string());
    }

    fn attach_media(&mut self) {
        let url = self.handle.url().unwrap_or_default();
        if let Some(media) = &self.media {
            media.attach_engine(&url);
            self.attached = true;
        }
        if let Some(levels) = self.ladder.clone() {
            self.handle.emit(EngineEvent::ManifestParsed { levels });
        }
    }

    fn set_current_level(&mut self, level: i32) {
        self.handle.state.lock().level = level;
    }

    fn start_load(&mut self) {
        self.handle.state.lock().start_load_calls += 1;
    }

    fn recover_media_error(&mut self) {
        self.handle.state.lock().recover_calls += 1;
    }

    fn destroy(&mut self) {
        {
            let mut s = self.handle.state.lock();
            if s.destroyed {
                return;
            }
            s.destroyed = true;
            s.destroy_calls += 1;
            s.events.clear();
        }
        if self.attached {
            if let Some(media) = &self.media {
                media.detach_engine();
            }
            self.attached = false;
        }
    }

    fn poll_events(&mut self) -> Vec<EngineEvent> {
        self.handle.state.lock().events.drain(..).collect()
    }
}

/// Factory handing out simulated engines.
#[derive(Clone, Default)]
pub struct SimulatedEngineFactory {
    media: Option<SimulatedMedia>,
    ladder: Option<Vec<LevelInfo>>,
    created: Arc<Mutex<Vec<SimulatedEngineHandle>>>,
    unsupported: bool,
}

impl SimulatedEngineFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engines attach to (and feed) this simulated element.
    pub fn with_media(mut self, media: &SimulatedMedia) -> Self {
        self.media = Some(media.clone());
        self
    }

    /// Engines report this rendition ladder as soon as they are attached.
    pub fn with_ladder(mut self, levels: Vec<LevelInfo>) -> Self {
        self.ladder = Some(levels);
        self
    }

    pub fn unsupported(mut self) -> Self {
        self.unsupported = true;
        self
    }

    /// Handles for every engine created so far, oldest first.
    pub fn engines(&self) -> Vec<SimulatedEngineHandle> {
        self.created.lock().clone()
    }

    /// The most recently created engine (a detached handle if none was created).
    pub fn engine(&self) -> SimulatedEngineHandle {
        self.created.lock().last().cloned().unwrap_or_default()
    }
}

impl EngineFactory for SimulatedEngineFactory {
    fn is_supported(&self) -> bool {
        !self.unsupported
    }

    fn create(&self, config: &EngineConfig) -> Option<Box<dyn AdaptiveEngine>> {
        if self.unsupported {
            return None;
        }
        let handle = SimulatedEngineHandle::default();
        handle.state.lock().config = Some(*config);
        self.created.lock().push(handle.clone());
        Some(Box::new(SimulatedEngine {
            handle,
            media: self.media.clone(),
            ladder: self.ladder.clone(),
            attached: false,
        }))
    }
}

#[derive(Debug, Default)]
struct ShellState {
    container_fullscreen: bool,
    pip_supported: bool,
    orientation_supported: bool,
    calls: Vec<&'static str>,
    events: VecDeque<PlatformEvent>,
}

/// Platform shell that records every call.
#[derive(Debug, Clone, Default)]
pub struct RecordingShell {
    state: Arc<Mutex<ShellState>>,
}

impl RecordingShell {
    /// A shell supporting container fullscreen, PiP and orientation lock.
    pub fn new() -> Self {
        let shell = Self::default();
        {
            let mut s = shell.state.lock();
            s.container_fullscreen = true;
            s.pip_supported = true;
            s.orientation_supported = true;
        }
        shell
    }

    /// Only element-level fullscreen is available (iOS Safari style).
    pub fn element_fullscreen_only(self) -> Self {
        self.state.lock().container_fullscreen = false;
        self
    }

    pub fn without_picture_in_picture(self) -> Self {
        self.state.lock().pip_supported = false;
        self
    }

    pub fn without_orientation_lock(self) -> Self {
        self.state.lock().orientation_supported = false;
        self
    }

    /// Calls received so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().calls.clone()
    }

    /// Queues a platform event (e.g. the user left fullscreen with Esc).
    pub fn emit(&self, event: PlatformEvent) {
        self.state.lock().events.push_back(event);
    }

    fn record(&self, call: &'static str) {
        self.state.lock().calls.push(call);
    }
}

impl PlatformShell for RecordingShell {
    fn supports_container_fullscreen(&self) -> bool {
        self.state.lock().container_fullscreen
    }

    fn request_container_fullscreen(&mut self) -> Result<(), PlatformError> {
        self.record("request_container_fullscreen");
        if self.supports_container_fullscreen() {
            Ok(())
        } else {
            Err(PlatformError::Unsupported("container fullscreen"))
        }
    }

    fn request_element_fullscreen(&mut self) -> Result<(), PlatformError> {
        self.record("request_element_fullscreen");
        Ok(())
    }

    fn exit_fullscreen(&mut self) -> Result<(), PlatformError> {
        self.record("exit_fullscreen");
        Ok(())
    }

    fn lock_landscape(&mut self) -> Result<(), PlatformError> {
        self.record("lock_landscape");
        if self.state.lock().orientation_supported {
            Ok(())
        } else {
            Err(PlatformError::Unsupported("orientation lock"))
        }
    }

    fn unlock_orientation(&mut self) -> Result<(), PlatformError> {
        self.record("unlock_orientation");
        if self.state.lock().orientation_supported {
            Ok(())
        } else {
            Err(PlatformError::Unsupported("orientation lock"))
        }
    }

    fn request_picture_in_picture(&mut self) -> Result<(), PlatformError> {
        self.record("request_picture_in_picture");
        if self.state.lock().pip_supported {
            Ok(())
        } else {
            Err(PlatformError::Unsupported("picture-in-picture"))
        }
    }

    fn exit_picture_in_picture(&mut self) -> Result<(), PlatformError> {
        self.record("exit_picture_in_picture");
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<PlatformEvent> {
        self.state.lock().events.drain(..).collect()
    }
}

#[derive(Debug, Default)]
struct TransportState {
    fail: bool,
    attempts: usize,
    requests: Vec<HistoryRequest>,
}

/// History transport that keeps every request in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    state: Arc<Mutex<TransportState>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose every dispatch fails.
    pub fn failing() -> Self {
        let transport = Self::default();
        transport.state.lock().fail = true;
        transport
    }

    /// Successfully dispatched requests, oldest first.
    pub fn requests(&self) -> Vec<HistoryRequest> {
        self.state.lock().requests.clone()
    }

    pub fn attempts(&self) -> usize {
        self.state.lock().attempts
    }
}

impl HistoryTransport for RecordingTransport {
    fn send(&self, request: HistoryRequest) -> Result<(), HistoryError> {
        let mut s = self.state.lock();
        s.attempts += 1;
        if s.fail {
            return Err(HistoryError::Transport("connection refused".to_string()));
        }
        s.requests.push(request);
        Ok(())
    }
}
