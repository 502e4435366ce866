//! Media sink and platform abstractions.
//!
//! The engine never talks to a `<video>` element or a window directly. A
//! platform binding implements:
//!
//! - [`MediaSink`]: the renderable media element (play/pause/seek/volume and
//!   its event stream)
//! - [`PlatformShell`]: fullscreen, picture-in-picture and orientation lock
//!
//! Media events are delivered as [`MediaEvent`] values and fanned out to a
//! [`MediaObserver`], whose callbacks mirror the element's native events.

use crate::error::{PlatformError, PlayRejection};

/// A native event reported by the media sink.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// Playback started or resumed
    Play,
    /// Playback paused at `position`
    Pause { position: f64 },
    /// Playback position advanced
    TimeUpdate { position: f64 },
    /// Duration became known or changed (NaN/inf when unknown)
    DurationChange { duration: f64 },
    /// Enough data is available to play ("canplay")
    Ready,
    /// Playback stalled waiting for data ("waiting")
    Waiting,
    /// The end of the buffered range moved
    Progress { buffered_end: f64 },
    /// Volume or mute state changed
    VolumeChange { volume: f32, muted: bool },
    /// Playback reached the end of the media
    Ended,
    /// An asynchronous `play()` request was refused
    PlayRejected(PlayRejection),
    /// The element reported a media error
    Error(String),
}

impl MediaEvent {
    /// Delivers the event to the matching observer callback.
    pub fn dispatch(&self, observer: &mut dyn MediaObserver) {
        match self {
            MediaEvent::Play => observer.on_play(),
            MediaEvent::Pause { position } => observer.on_pause(*position),
            MediaEvent::TimeUpdate { position } => observer.on_time_update(*position),
            MediaEvent::DurationChange { duration } => observer.on_duration_change(*duration),
            MediaEvent::Ready => {
                observer.on_buffering_change(false);
                observer.on_ready();
            }
            MediaEvent::Waiting => observer.on_buffering_change(true),
            MediaEvent::Progress { buffered_end } => observer.on_buffered(*buffered_end),
            MediaEvent::VolumeChange { volume, muted } => {
                observer.on_volume_change(*volume, *muted)
            }
            MediaEvent::Ended => observer.on_ended(),
            MediaEvent::PlayRejected(reason) => observer.on_play_rejected(reason),
            MediaEvent::Error(message) => observer.on_error(message),
        }
    }
}

/// Callback interface over the media sink's events.
///
/// All methods default to no-ops so observers only implement what they need.
pub trait MediaObserver {
    fn on_play(&mut self) {}
    fn on_pause(&mut self, _position: f64) {}
    fn on_time_update(&mut self, _position: f64) {}
    fn on_duration_change(&mut self, _duration: f64) {}
    fn on_ready(&mut self) {}
    fn on_buffering_change(&mut self, _buffering: bool) {}
    fn on_buffered(&mut self, _buffered_end: f64) {}
    fn on_volume_change(&mut self, _volume: f32, _muted: bool) {}
    fn on_ended(&mut self) {}
    fn on_play_rejected(&mut self, _reason: &PlayRejection) {}
    fn on_error(&mut self, _message: &str) {}
}

/// The renderable media element the player drives.
pub trait MediaSink {
    /// Assigns a URL for native playback (direct media or natively supported manifest).
    fn set_source(&mut self, url: &str);
    /// Detaches the current source and stops any network activity.
    fn clear_source(&mut self);
    /// Whether the platform plays segmented manifests natively.
    fn supports_native_manifest(&self) -> bool;

    /// Requests playback. Synchronous refusals are returned here; platforms
    /// that refuse asynchronously report [`MediaEvent::PlayRejected`] instead.
    fn play(&mut self) -> Result<(), PlayRejection>;
    fn pause(&mut self);
    fn is_paused(&self) -> bool;

    fn seek(&mut self, position: f64);
    fn position(&self) -> f64;
    /// Duration in seconds, `None` while unknown.
    fn duration(&self) -> Option<f64>;

    fn set_volume(&mut self, volume: f32);
    fn volume(&self) -> f32;
    fn set_muted(&mut self, muted: bool);
    fn is_muted(&self) -> bool;

    /// Applies the visual brightness filter. Never touches system brightness.
    fn set_brightness(&mut self, factor: f32);

    /// Drains events reported since the last call.
    fn poll_events(&mut self) -> Vec<MediaEvent>;
}

/// State changes reported by the platform shell (e.g. user pressed Esc).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformEvent {
    FullscreenChanged(bool),
    PictureInPictureChanged(bool),
}

/// Optional presentation features of the hosting platform.
///
/// Every call is best-effort; callers log and ignore failures.
pub trait PlatformShell {
    /// Whether the player container itself can go fullscreen.
    fn supports_container_fullscreen(&self) -> bool;
    fn request_container_fullscreen(&mut self) -> Result<(), PlatformError>;
    /// Element-level fullscreen of the media element (e.g. iOS Safari).
    fn request_element_fullscreen(&mut self) -> Result<(), PlatformError>;
    fn exit_fullscreen(&mut self) -> Result<(), PlatformError>;

    fn lock_landscape(&mut self) -> Result<(), PlatformError>;
    fn unlock_orientation(&mut self) -> Result<(), PlatformError>;

    fn request_picture_in_picture(&mut self) -> Result<(), PlatformError>;
    fn exit_picture_in_picture(&mut self) -> Result<(), PlatformError>;

    /// Drains events reported since the last call.
    fn poll_events(&mut self) -> Vec<PlatformEvent> {
        Vec::new()
    }
}

/// A shell with no optional features, for hosts that only embed playback.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessShell;

impl PlatformShell for HeadlessShell {
    fn supports_container_fullscreen(&self) -> bool {
        false
    }

    fn request_container_fullscreen(&mut self) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("fullscreen"))
    }

    fn request_element_fullscreen(&mut self) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("fullscreen"))
    }

    fn exit_fullscreen(&mut self) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("fullscreen"))
    }

    fn lock_landscape(&mut self) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("orientation lock"))
    }

    fn unlock_orientation(&mut self) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("orientation lock"))
    }

    fn request_picture_in_picture(&mut self) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("picture-in-picture"))
    }

    fn exit_picture_in_picture(&mut self) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("picture-in-picture"))
    }
}
