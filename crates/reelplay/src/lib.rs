//! reelplay: adaptive video playback with touch gestures for egui
//!
//! This crate wraps the headless [`reelplay_core::PlayerController`] in an
//! egui widget: overlay controls, a touch gesture layer, seek and swipe
//! feedback, and an episode drawer.
//!
//! # Platform Support
//!
//! | Platform | Media sink | Adaptive streaming |
//! |----------|------------|--------------------|
//! | Web (wasm32) | `<video>` element | hls.js, or native HLS on Safari |
//! | Native | any [`MediaSink`](reelplay_core::media::MediaSink) | host-provided engine |
//!
//! # Example
//!
//! ```ignore
//! use reelplay::{VideoPlayer, VideoPlayerExt};
//! use reelplay_core::StreamSource;
//!
//! // Created once and stored in app state:
//! let mut player = VideoPlayer::new(controller);
//! player.load(StreamSource::new("https://cdn.example/show/ep1/index.m3u8"), None);
//!
//! // In update():
//! let response = ui.video_player(&mut player, ui.available_size());
//! if let Some(slug) = response.navigate {
//!     // switch episodes
//! }
//! ```

pub mod media;

pub use reelplay_core;

pub use media::{
    EpisodeDrawerStyle, PageLifecycleEvent, SeekInput, UnloadFlush, VideoControls,
    VideoControlsConfig, VideoControlsResponse, VideoPlayer, VideoPlayerExt, VideoPlayerResponse,
};

#[cfg(target_arch = "wasm32")]
pub use media::{
    BodyScrollLock, FetchHistoryTransport, HlsEngineFactory, PerformanceClock, UnloadGuard,
    WebShell, WebVideoSink,
};
