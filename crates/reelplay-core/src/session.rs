//! Playback session data model.

use serde::{Deserialize, Serialize};

/// Level index meaning "let the adaptive engine pick".
pub const AUTO_LEVEL: i32 = -1;

/// What the caller asks the player to play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSource {
    /// Manifest (`.m3u8`) or direct media URL
    pub url: String,
    /// Optional title shown over the video
    pub title: Option<String>,
    /// Whether the episode list button should be offered
    pub has_multiple_episodes: bool,
}

impl StreamSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            has_multiple_episodes: false,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_episodes(mut self, has_multiple_episodes: bool) -> Self {
        self.has_multiple_episodes = has_multiple_episodes;
        self
    }
}

/// One selectable rendition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityLevel {
    pub label: String,
    /// Engine level index, [`AUTO_LEVEL`] for automatic selection
    pub level_index: i32,
}

/// Previously saved position offered to the player on mount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeHint {
    #[serde(default)]
    pub episode_slug: Option<String>,
    pub current_time: f64,
    pub duration: f64,
}

impl ResumeHint {
    pub fn new(current_time: f64, duration: f64) -> Self {
        Self {
            episode_slug: None,
            current_time,
            duration,
        }
    }
}

/// Position report handed to the progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub current_time: f64,
    pub duration: f64,
}

/// Coarse loading state of the session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PlaybackPhase {
    /// Source assigned, waiting for the first "ready to play"
    #[default]
    Loading,
    /// Media can play
    Ready,
    /// Playback stalled waiting for data
    Buffering,
    /// Recovery exhausted; nothing more will happen without a new source
    Unavailable { reason: String },
}

impl PlaybackPhase {
    /// Whether the loading spinner should be shown.
    pub fn is_loading(&self) -> bool {
        matches!(self, PlaybackPhase::Loading | PlaybackPhase::Buffering)
    }
}

/// Observable state of the current stream.
///
/// Owned by the player while a source is mounted and recreated whenever the
/// source URL changes.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    pub source_url: String,
    pub playing: bool,
    pub muted: bool,
    /// 0.0 to 1.0
    pub volume: f32,
    pub current_time: f64,
    pub duration: f64,
    pub buffered_end: f64,
    pub quality_levels: Vec<QualityLevel>,
    pub active_level: i32,
    pub fullscreen: bool,
    pub picture_in_picture: bool,
    /// Visual brightness filter, 0.2 to 2.0
    pub brightness: f32,
    pub phase: PlaybackPhase,
}

impl PlaybackSession {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            playing: false,
            muted: false,
            volume: 1.0,
            current_time: 0.0,
            duration: 0.0,
            buffered_end: 0.0,
            quality_levels: Vec::new(),
            active_level: AUTO_LEVEL,
            fullscreen: false,
            picture_in_picture: false,
            brightness: 1.0,
            phase: PlaybackPhase::Loading,
        }
    }

    /// Whether the duration is known and positive.
    pub fn has_duration(&self) -> bool {
        self.duration.is_finite() && self.duration > 0.0
    }

    /// Clamps a position into `[0, duration]` (or `[0, inf)` when unknown).
    pub fn clamp_position(&self, position: f64) -> f64 {
        let position = if position.is_finite() { position.max(0.0) } else { 0.0 };
        if self.has_duration() {
            position.min(self.duration)
        } else {
            position
        }
    }

    pub fn set_current_time(&mut self, position: f64) {
        self.current_time = self.clamp_position(position);
    }

    pub fn set_duration(&mut self, duration: f64) {
        self.duration = if duration.is_finite() && duration > 0.0 {
            duration
        } else {
            0.0
        };
        self.current_time = self.clamp_position(self.current_time);
    }

    /// Played fraction, 0.0 when the duration is unknown.
    pub fn progress_ratio(&self) -> f32 {
        if self.has_duration() {
            (self.current_time / self.duration).clamp(0.0, 1.0) as f32
        } else {
            0.0
        }
    }

    /// Buffered fraction, 0.0 when the duration is unknown.
    pub fn buffered_ratio(&self) -> f32 {
        if self.has_duration() {
            (self.buffered_end / self.duration).clamp(0.0, 1.0) as f32
        } else {
            0.0
        }
    }

    /// Current position as a progress snapshot, if the duration is known.
    pub fn snapshot(&self) -> Option<ProgressSnapshot> {
        self.has_duration().then(|| ProgressSnapshot {
            current_time: self.current_time,
            duration: self.duration,
        })
    }
}
