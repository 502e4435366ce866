//! Tunable behavior of the player engine.
//!
//! Every constant the control surface depends on lives here with its
//! reference value as the default. Hosts adjust them with the `with_*`
//! builders:
//!
//! ```
//! use std::time::Duration;
//! use reelplay_core::PlayerConfig;
//!
//! let config = PlayerConfig::default()
//!     .with_double_tap_window(Duration::from_millis(250))
//!     .with_seek_step(10.0);
//! assert_eq!(config.seek_step_secs, 10.0);
//! ```

use std::time::Duration;

/// Lowest brightness filter factor a swipe can reach.
pub const MIN_BRIGHTNESS: f32 = 0.2;
/// Highest brightness filter factor a swipe can reach.
pub const MAX_BRIGHTNESS: f32 = 2.0;

/// Configuration for a [`PlayerController`](crate::PlayerController).
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Window in which a second tap upgrades a single tap to a double tap
    pub double_tap_window: Duration,
    /// Seconds skipped by a double tap
    pub seek_step_secs: f64,
    /// Minimum vertical travel (px) before a touch becomes a swipe
    pub swipe_threshold_px: f32,
    /// How long the volume/brightness indicator stays up
    pub gesture_indicator_ttl: Duration,
    /// How long the double-tap seek badge stays up
    pub seek_indicator_ttl: Duration,
    /// Idle time before controls hide while playing
    pub controls_hide_delay: Duration,
    /// Minimum spacing between periodic progress snapshots while playing
    pub progress_interval: Duration,
    /// Seconds skipped by the arrow keys
    pub keyboard_seek_secs: f64,
    /// Volume change per arrow-up/down key press
    pub keyboard_volume_step: f32,
    /// Forward buffer target handed to the adaptive engine
    pub max_buffer_length: Duration,
    /// Hard cap on the adaptive engine's forward buffer
    pub max_max_buffer_length: Duration,
    /// Label of the automatic quality entry
    pub auto_quality_label: String,
    /// Recoveries allowed for one source across all stall/ready cycles
    pub max_recoveries_per_source: u32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            double_tap_window: Duration::from_millis(300),
            seek_step_secs: 5.0,
            swipe_threshold_px: 10.0,
            gesture_indicator_ttl: Duration::from_millis(800),
            seek_indicator_ttl: Duration::from_millis(600),
            controls_hide_delay: Duration::from_millis(3000),
            progress_interval: Duration::from_secs(5),
            keyboard_seek_secs: 10.0,
            keyboard_volume_step: 0.1,
            max_buffer_length: Duration::from_secs(30),
            max_max_buffer_length: Duration::from_secs(60),
            auto_quality_label: "Automatic".to_string(),
            max_recoveries_per_source: 3,
        }
    }
}

impl PlayerConfig {
    pub fn with_double_tap_window(mut self, window: Duration) -> Self {
        self.double_tap_window = window;
        self
    }

    pub fn with_seek_step(mut self, secs: f64) -> Self {
        self.seek_step_secs = secs.max(0.0);
        self
    }

    pub fn with_swipe_threshold(mut self, px: f32) -> Self {
        self.swipe_threshold_px = px.max(0.0);
        self
    }

    pub fn with_controls_hide_delay(mut self, delay: Duration) -> Self {
        self.controls_hide_delay = delay;
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_keyboard_steps(mut self, seek_secs: f64, volume_step: f32) -> Self {
        self.keyboard_seek_secs = seek_secs.max(0.0);
        self.keyboard_volume_step = volume_step.clamp(0.0, 1.0);
        self
    }

    pub fn with_indicator_ttls(mut self, seek: Duration, gesture: Duration) -> Self {
        self.seek_indicator_ttl = seek;
        self.gesture_indicator_ttl = gesture;
        self
    }

    pub fn with_buffer_lengths(mut self, max: Duration, max_max: Duration) -> Self {
        self.max_buffer_length = max;
        self.max_max_buffer_length = max_max.max(max);
        self
    }

    pub fn with_auto_quality_label(mut self, label: impl Into<String>) -> Self {
        self.auto_quality_label = label.into();
        self
    }

    pub fn with_max_recoveries(mut self, max: u32) -> Self {
        self.max_recoveries_per_source = max;
        self
    }
}

/// Decides whether saved progress is worth resuming.
///
/// Resume is offered only when the saved position is past the opening seconds
/// and not inside the closing seconds of the episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResumePolicy {
    /// Saved positions at or below this are treated as "not started"
    pub min_position_secs: f64,
    /// Saved positions with this much or less remaining are treated as "finished"
    pub min_remaining_secs: f64,
}

impl Default for ResumePolicy {
    fn default() -> Self {
        Self {
            min_position_secs: 10.0,
            min_remaining_secs: 30.0,
        }
    }
}

impl ResumePolicy {
    /// Returns the position to resume at, if any.
    pub fn resume_position(&self, current_time: f64, duration: f64) -> Option<f64> {
        if !current_time.is_finite() || !duration.is_finite() {
            return None;
        }
        if current_time > self.min_position_secs
            && duration - current_time > self.min_remaining_secs
        {
            Some(current_time)
        } else {
            None
        }
    }
}

/// Configuration for the progress bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Delay between the last progress update and the remote write
    pub debounce: Duration,
    /// Maximum number of titles kept in the local history cache
    pub max_history: usize,
    /// Remote watch-history endpoint
    pub endpoint: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_secs(3),
            max_history: 50,
            endpoint: "/api/user/watch-history".to_string(),
        }
    }
}

impl BridgeConfig {
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_max_history(mut self, max: usize) -> Self {
        self.max_history = max.max(1);
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}
