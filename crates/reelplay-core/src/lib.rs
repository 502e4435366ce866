//! reelplay-core: headless adaptive playback and gesture-control engine.
//!
//! This crate holds the UI-free part of a streaming video player:
//!
//! - Stream loading with adaptive-bitrate engines: [`loader`]
//! - Mirroring media state and emitting progress snapshots: [`tracker`]
//! - Touch gesture classification (tap / double tap / vertical swipe): [`gesture`]
//! - Transport control logic (seek bar, auto-hide, shortcuts, fullscreen): [`controls`]
//! - Episode navigation drawer state: [`drawer`]
//! - Resume gating and debounced progress persistence: [`progress`]
//!
//! Everything is driven by [`controller::PlayerController`], one instance per
//! mounted player. Platform bindings (browser `<video>`, hls.js, fullscreen
//! APIs) implement the traits in [`media`] and [`loader`]; the [`sim`] module
//! provides deterministic stand-ins for tests and demos.
//!
//! This crate has **zero egui dependency**. It is consumed by:
//! - `reelplay` (egui integration layer and browser bindings)
//! - `reelplay-demo` (native demo driving the simulated sink)

pub mod clock;
pub mod config;
pub mod controller;
pub mod controls;
pub mod drawer;
pub mod error;
pub mod gesture;
pub mod loader;
pub mod media;
pub mod progress;
pub mod session;
pub mod sim;
pub mod timer;
pub mod tracker;

#[cfg(all(feature = "http", not(target_arch = "wasm32")))]
pub mod network;

pub use clock::{Clock, ManualClock};
#[cfg(not(target_arch = "wasm32"))]
pub use clock::SystemClock;
pub use config::{BridgeConfig, PlayerConfig, ResumePolicy};
pub use controller::PlayerController;
pub use error::{HistoryError, LoaderError, PlatformError, PlayRejection, PlayerError};
pub use session::{
    PlaybackPhase, PlaybackSession, ProgressSnapshot, QualityLevel, ResumeHint, StreamSource,
    AUTO_LEVEL,
};
