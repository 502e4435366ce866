//! Error types for the player engine.
//!
//! Nothing in the engine surfaces these to the hosting page: the controller
//! logs and contains them. They exist so the seams (platform shell, history
//! transport, quality selection) can report *why* something failed.

use thiserror::Error;

/// Why a `play()` request was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayRejection {
    /// The platform's autoplay policy requires a user gesture (or muting)
    #[error("autoplay blocked by platform policy")]
    NotAllowed,
    /// Playback failed for any other reason
    #[error("play request failed: {0}")]
    Other(String),
}

/// Failure of an optional platform feature (fullscreen, PiP, orientation lock).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),
    #[error("platform rejected request: {0}")]
    Rejected(String),
}

/// Errors from the adaptive stream loader.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoaderError {
    #[error("quality selection requires an adaptive engine")]
    NoAdaptiveEngine,
    #[error("unknown quality level {0}")]
    UnknownLevel(i32),
}

/// Errors from watch-history persistence.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to serialize history: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid history endpoint: {0}")]
    Endpoint(String),
    #[error("history transport failed: {0}")]
    Transport(String),
    #[error("history endpoint returned HTTP {0}")]
    Status(u16),
}

/// Top-level error type.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error("media error: {0}")]
    Media(String),
}
