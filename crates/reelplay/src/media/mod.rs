//! egui rendering and platform bindings for the player engine.

mod episode_drawer;
mod page_lifecycle;
mod video_controls;
mod video_player;

#[cfg(target_arch = "wasm32")]
mod web_shell;
#[cfg(target_arch = "wasm32")]
mod web_video;

pub use episode_drawer::{show_episode_drawer, EpisodeDrawerStyle};
pub use page_lifecycle::{PageLifecycleEvent, UnloadFlush};
pub use video_controls::{
    quality_button_label, SeekInput, VideoControls, VideoControlsConfig, VideoControlsResponse,
};
pub use video_player::{VideoPlayer, VideoPlayerExt, VideoPlayerResponse};

#[cfg(target_arch = "wasm32")]
pub use web_shell::{
    BodyScrollLock, FetchHistoryTransport, PerformanceClock, UnloadGuard, WebShell,
};
#[cfg(target_arch = "wasm32")]
pub use web_video::{HlsEngineFactory, WebVideoSink};
